use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::info;

use cinesift::config::Config;
use cinesift::filter::FilterCriteria;
use cinesift::lists::parse_list_refs;
use cinesift::pipeline::{run_recommend, run_supplement, Collaborators, CollectionCriteria};

fn filter_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("earliest")
                .long("earliest")
                .value_name("YEAR")
                .help("Earliest release year of a film to recommend")
                .default_value("1900"),
        )
        .arg(
            Arg::new("language")
                .long("language")
                .value_name("CODE")
                .help("Original language of the movie"),
        )
        .arg(
            Arg::new("max-runtime")
                .long("max-runtime")
                .value_name("MINUTES")
                .help("Maximum runtime of a movie to recommend"),
        )
        .arg(
            Arg::new("min-runtime")
                .long("min-runtime")
                .value_name("MINUTES")
                .help("Minimum runtime of a movie to recommend")
                .default_value("15"),
        )
        .arg(
            Arg::new("genre")
                .long("genre")
                .value_name("GENRE")
                .help("Only recommend films in this genre; repeatable")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("director")
                .long("director")
                .value_name("NAME")
                .help("Only recommend films credited to this director; repeatable")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("title-glob")
                .long("title-glob")
                .value_name("GLOB")
                .help("Only keep films whose title matches one of these globs; repeatable")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("include-watched")
                .long("include-watched")
                .help("Include films you have already watched")
                .action(ArgAction::SetTrue),
        )
}

fn cli() -> Command {
    Command::new("cinesift")
        .version("0.1.0")
        .about("Film recommendations from catalog lists, pruned against what you can already watch")
        .subcommand_required(true)
        .subcommand(
            filter_args(
                Command::new("recommend")
                    .about("Recommend a movie to watch")
                    .arg(
                        Arg::new("list")
                            .long("list")
                            .value_name("OWNER/SLUG")
                            .help("Draw candidates from this catalog list; repeatable")
                            .action(ArgAction::Append),
                    )
                    .arg(
                        Arg::new("watchlist")
                            .short('w')
                            .long("watchlist")
                            .help("Draw candidates from your own watchlist")
                            .action(ArgAction::SetTrue),
                    )
                    .arg(
                        Arg::new("top250")
                            .long("top250")
                            .help("Draw candidates from the top 250 narrative films")
                            .action(ArgAction::SetTrue),
                    )
                    .arg(
                        Arg::new("include-not-streaming")
                            .long("include-not-streaming")
                            .help("Include films that aren't streaming anywhere")
                            .action(ArgAction::SetTrue),
                    )
                    .arg(
                        Arg::new("only-my-streaming")
                            .long("only-my-streaming")
                            .help("Only films watchable on a subscribed service or locally")
                            .action(ArgAction::SetTrue),
                    )
                    .arg(
                        Arg::new("only-not-my-streaming")
                            .long("only-not-my-streaming")
                            .help("Only films NOT watchable on a subscribed service or locally")
                            .action(ArgAction::SetTrue),
                    ),
            ),
        )
        .subcommand(
            filter_args(
                Command::new("supplement")
                    .about("Supplement your streaming content with missing films")
                    .long_about(
                        "Find films you can't already watch and submit them to the download queue.",
                    )
                    .arg(
                        Arg::new("list")
                            .long("list")
                            .value_name("OWNER/SLUG")
                            .help("Draw candidates from this catalog list; repeatable")
                            .action(ArgAction::Append)
                            .required(true),
                    )
                    .arg(
                        Arg::new("dry-run")
                            .long("dry-run")
                            .help("Don't actually submit anything to the queue")
                            .action(ArgAction::SetTrue),
                    ),
            ),
        )
}

fn strings(matches: &ArgMatches, name: &str) -> Vec<String> {
    matches
        .get_many::<String>(name)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn shared_criteria(matches: &ArgMatches) -> Result<FilterCriteria> {
    let max_runtime_mins = matches
        .get_one::<String>("max-runtime")
        .map(|raw| raw.parse::<u32>())
        .transpose()?;
    let min_runtime_mins = matches
        .get_one::<String>("min-runtime")
        .map(|raw| raw.parse::<u32>())
        .transpose()?;

    Ok(FilterCriteria {
        earliest_year: matches.get_one::<String>("earliest").unwrap().parse()?,
        language: matches.get_one::<String>("language").cloned(),
        max_runtime_mins,
        min_runtime_mins,
        include_watched: matches.get_flag("include-watched"),
        genres: strings(matches, "genre"),
        directors: strings(matches, "director"),
        title_globs: strings(matches, "title-glob"),
        ..Default::default()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("cinesift=info,warn")
        .init();

    let matches = cli().get_matches();

    let config = Config::load()?;
    let collaborators = Collaborators::from_config(&config)?;

    match matches.subcommand() {
        Some(("recommend", sub)) => {
            let mut criteria = shared_criteria(sub)?;
            criteria.require_streaming = !sub.get_flag("include-not-streaming");
            criteria.only_my_streaming = sub.get_flag("only-my-streaming");
            criteria.only_not_my_streaming = sub.get_flag("only-not-my-streaming");

            let collection = CollectionCriteria {
                lists: parse_list_refs(&strings(sub, "list"))?,
                include_watchlist: sub.get_flag("watchlist"),
                include_top250: sub.get_flag("top250"),
            };

            let mut stdout = std::io::stdout();
            let stats = run_recommend(
                &collaborators,
                &config.profile,
                &criteria,
                &collection,
                &mut stdout,
            )
            .await?;
            info!(
                "📊 {} watched, {} collected, {} kept",
                stats.watched, stats.collected, stats.kept
            );
        }
        Some(("supplement", sub)) => {
            let queue_config = config.queue.clone().ok_or_else(|| {
                anyhow::anyhow!("supplement requires a [queue] section in the configuration")
            })?;

            let mut criteria = shared_criteria(sub)?;
            // Supplement exists to fill the gaps in what you can already
            // watch, so the exclusivity filter is always on.
            criteria.only_not_my_streaming = true;

            let lists = parse_list_refs(&strings(sub, "list"))?;
            let dry_run = sub.get_flag("dry-run");

            let stats = run_supplement(
                &collaborators,
                &config.profile,
                &criteria,
                &lists,
                &queue_config,
                dry_run,
            )
            .await?;
            info!(
                "📊 {} watched, {} collected, {} queued",
                stats.watched, stats.collected, stats.kept
            );
        }
        _ => unreachable!("subcommand is required"),
    }

    Ok(())
}

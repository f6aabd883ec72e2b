use clap::{Arg, ArgAction, ArgMatches, Command};
use routeprobe::backend::HttpBackend;
use routeprobe::config::{self, ConfigLoader, Configuration};
use routeprobe::logger;
use routeprobe::network::NetworkUtils;
use routeprobe::probe::HttpProbe;
use routeprobe::report::{self, SuiteReport, EXIT_OK, EXIT_SETUP};
use routeprobe::routes::RouteTable;
use routeprobe::runner::Suite;
use routeprobe::shutdown::{CancelToken, ShutdownManager};
use std::env;
use std::path::Path;
use std::process::exit;

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

fn cli() -> Command {
    Command::new("routeprobe")
        .version(PKG_VERSION)
        .author("Vincent Bruijn <vebruijn@gmail.com>")
        .about("Check that a running forum answers its public routes with the expected status and body")
        .long_about("routeprobe seeds a category, a user and a topic through the forum's admin API, requests every public route once and compares each response with what the route should return.\n\nAll seeded data is removed again when the run ends, including after a failure or an interrupt.")
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Base URL of the forum under test (default: http://localhost:4567)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file (routeprobe.json or package.json)"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64))
                .help("Per-request timeout in milliseconds"),
        )
        .arg(
            Arg::new("admin-token")
                .long("admin-token")
                .value_name("TOKEN")
                .help("Bearer token for the forum's admin API"),
        )
        .arg(
            Arg::new("lenient")
                .long("lenient")
                .action(ArgAction::SetTrue)
                .help("Only require a non-empty body for JSON and feed routes"),
        )
        .arg(
            Arg::new("only")
                .long("only")
                .value_name("TEXT")
                .help("Run only cases whose name or path contains TEXT"),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .value_name("FILE")
                .help("Write a JSON report of the run to FILE"),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .action(ArgAction::SetTrue)
                .help("Print the route table and exit without contacting the forum"),
        )
        .arg(
            Arg::new("no-preflight")
                .long("no-preflight")
                .action(ArgAction::SetTrue)
                .help("Skip the reachability check before seeding"),
        )
        .arg(
            Arg::new("no-timestamps")
                .short('T')
                .long("no-timestamps")
                .action(ArgAction::SetTrue)
                .help("Disable timestamps in log messages"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Only print failing cases and the summary"),
        )
}

/// File, then environment, then command line.
fn load_configuration(matches: &ArgMatches) -> Result<Configuration, config::ConfigError> {
    let custom_config = matches.get_one::<String>("config").map(|s| s.as_str());
    let search_dir = env::current_dir()?;
    let mut configuration = ConfigLoader::new(search_dir).load_configuration(custom_config)?;

    configuration.apply_env(|key| env::var(key).ok());

    if let Some(url) = matches.get_one::<String>("url") {
        configuration.base_url = url.clone();
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        configuration.timeout_ms = *timeout;
    }
    if let Some(token) = matches.get_one::<String>("admin-token") {
        configuration.admin.token = Some(token.clone());
    }
    if matches.get_flag("lenient") {
        configuration.body_checks = routeprobe::assertions::BodyChecks::Lenient;
    }

    configuration.validate()?;
    Ok(configuration)
}

fn print_table(table: &RouteTable) {
    for route in table.routes() {
        let given = route
            .given
            .iter()
            .map(|(key, value)| format!("{}={:?}", key, value))
            .collect::<Vec<_>>()
            .join(", ");
        if given.is_empty() {
            println!("{:<44} {}  {}  ({})", route.path, route.status, route.body, route.name);
        } else {
            println!(
                "{:<44} {}  {}  ({}) [{}]",
                route.path, route.status, route.body, route.name, given
            );
        }
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("routeprobe=warn"));

    let show_passing = !matches.get_flag("quiet");
    let enable_timestamps = !matches.get_flag("no-timestamps");
    logger::init_logger(show_passing, enable_timestamps);
    let app_logger = logger::get_logger();

    let configuration = match load_configuration(&matches) {
        Ok(config) => config,
        Err(e) => {
            app_logger.error(&format!("Configuration error: {}", e));
            exit(EXIT_SETUP);
        }
    };

    let mut table = RouteTable::standard().with_extra(configuration.routes.clone());
    if let Some(needle) = matches.get_one::<String>("only") {
        table = table.filter(needle);
        if table.is_empty() {
            app_logger.error(&format!("No route matches --only {:?}", needle));
            exit(EXIT_SETUP);
        }
    }

    if let Err(e) = table.check_templates() {
        app_logger.error(&format!("Route table error: {}", e));
        exit(EXIT_SETUP);
    }

    if matches.get_flag("list") {
        print_table(&table);
        exit(EXIT_OK);
    }

    let base_url = configuration.base_url().to_string();
    app_logger.startup_info(PKG_NAME, PKG_VERSION, &base_url);

    if !matches.get_flag("no-preflight") {
        if let Err(e) = NetworkUtils::preflight(&base_url) {
            app_logger.error(&e.to_string());
            exit(EXIT_SETUP);
        }
    }

    let cancel = CancelToken::new();
    let mut shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.install(cancel.clone()) {
        app_logger.warn(&format!("Failed to setup signal handling: {}", e));
    }

    let backend = match HttpBackend::new(
        &base_url,
        &configuration.admin.base_path,
        configuration.admin.token.clone(),
        configuration.timeout(),
    ) {
        Ok(backend) => backend,
        Err(e) => {
            app_logger.error(&e.to_string());
            exit(EXIT_SETUP);
        }
    };

    let probe = match HttpProbe::new(configuration.timeout(), cancel.clone()) {
        Ok(probe) => probe,
        Err(e) => {
            app_logger.error(&e.to_string());
            exit(EXIT_SETUP);
        }
    };

    app_logger.info(&format!("Running {} cases", table.len()));

    let run = Suite::new(&backend, &probe, &base_url, table)
        .with_fixtures(configuration.fixtures.clone())
        .with_body_checks(configuration.body_checks)
        .with_cancel(cancel)
        .run()
        .await;

    shutdown_manager.close();

    let counts = run.counts();
    if run.setup_error.is_none() {
        app_logger.summary(counts.passed, counts.failed, counts.errored, counts.skipped);
    }

    if let Some(path) = matches.get_one::<String>("report") {
        match SuiteReport::new(&run, &base_url).write_to(Path::new(path)) {
            Ok(()) => app_logger.info(&format!("Report written to {}", path)),
            Err(e) => app_logger.error(&format!("Could not write report to {}: {}", path, e)),
        }
    }

    exit(report::exit_code(&run));
}

use std::process::exit;

use clap::{crate_authors, crate_version, Arg, ArgMatches, Command};
use env_logger::Env;
use tokio::runtime::Runtime;

use benchlink::protocol::scpi;
use benchlink::{Channel, Config, Resolver, ScpiRequest, ScpiResponse, SystemTransport, Transport};

fn cli() -> Command<'static> {
    Command::new("benchlink")
        .author(crate_authors!())
        .version(crate_version!())
        .about("Locate bench instruments by their *IDN? model and talk to them")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(Arg::new("verbose").long("verbose").short('v').help("Log verbose output"))
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .help("JSON configuration file"),
        )
        .arg(
            Arg::new("tcp")
                .long("tcp")
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Additional TCP endpoint to probe, e.g. tcp::192.168.0.10:5025"),
        )
        .arg(Arg::new("no-serial").long("no-serial").help("Do not scan serial ports"))
        .subcommand(Command::new("list").about("List visible endpoints"))
        .subcommand(
            Command::new("find")
                .about("Find an instrument reporting one of the given models")
                .arg(
                    Arg::new("model")
                        .long("model")
                        .short('m')
                        .takes_value(true)
                        .multiple_occurrences(true)
                        .required(true)
                        .help("Acceptable model name, may be repeated"),
                )
                .arg(
                    Arg::new("address")
                        .long("address")
                        .short('a')
                        .takes_value(true)
                        .help("Only probe this endpoint"),
                )
                .arg(Arg::new("json").long("json").help("Print the identity as JSON")),
        )
        .subcommand(
            Command::new("send")
                .about("Send a command, print the reply of queries")
                .arg(Arg::new("endpoint").required(true).index(1))
                .arg(Arg::new("command").required(true).index(2)),
        )
}

fn load_config(matches: &ArgMatches) -> benchlink::Result<Config> {
    let mut config = match matches.value_of("config") {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(endpoints) = matches.values_of("tcp") {
        config
            .transport
            .tcp_endpoints
            .extend(endpoints.map(|x| x.to_string()));
    }
    if matches.is_present("no-serial") {
        config.transport.scan_serial = false;
    }
    Ok(config)
}

async fn list(transport: SystemTransport) -> benchlink::Result<()> {
    for endpoint in transport.list_endpoints().await? {
        println!("{}", endpoint);
    }
    Ok(())
}

async fn find(transport: SystemTransport, matches: &ArgMatches) -> benchlink::Result<()> {
    let models: Vec<&str> = matches.values_of("model").map(|x| x.collect()).unwrap_or_default();
    let resolver = Resolver::new(transport);
    let resolved = resolver.resolve_or_err(matches.value_of("address"), &models[..]).await?;
    if matches.is_present("json") {
        let json = serde_json::to_string_pretty(&resolved.identity).map_err(benchlink::Error::internal)?;
        println!("{}", json);
    } else {
        println!("{}", resolved.identity);
        println!("Endpoint: {}", resolved.channel.endpoint());
    }
    resolved.channel.close().await
}

async fn send(transport: SystemTransport, matches: &ArgMatches) -> benchlink::Result<Option<String>> {
    let endpoint = matches.value_of("endpoint").unwrap_or_default();
    let command = matches.value_of("command").unwrap_or_default();
    let mut channel = transport.open(endpoint).await?;
    channel.claim().await?;
    let ret = scpi::handle(&mut channel, ScpiRequest::from_command(command)).await;
    channel.close().await?;
    match ret? {
        ScpiResponse::String(reply) => Ok(Some(reply)),
        ScpiResponse::Done => Ok(None),
    }
}

async fn run(matches: ArgMatches, config: Config) -> benchlink::Result<()> {
    let transport = SystemTransport::new(config.transport);
    match matches.subcommand() {
        Some(("list", _)) => list(transport).await,
        Some(("find", sub)) => find(transport, sub).await,
        Some(("send", sub)) => {
            if let Some(reply) = send(transport, sub).await? {
                println!("{}", reply);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn main() {
    let matches = cli().get_matches();

    if matches.is_present("verbose") {
        env_logger::Builder::from_env(Env::default().default_filter_or("benchlink=debug")).init();
    } else {
        env_logger::init();
    }

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("Cannot start runtime: {}", err);
            exit(1);
        }
    };
    if let Err(err) = rt.block_on(run(matches, config)) {
        eprintln!("{}", err);
        exit(1);
    }
    log::debug!("Application quitting.");
}

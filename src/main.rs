use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use gridstream::{
    engine::Graph,
    grid::{Balance, BinaryEdgeFile, EdgeSource, GridBuilder, SqliteEdges, TextEdgeFile},
    types::EdgeType,
};
use std::error::Error;

const GIB: u64 = 1024 * 1024 * 1024;

fn handle_preprocess(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let input = matches.value_of("INPUT").unwrap();
    let edge_type = if matches.is_present("weighted") {
        EdgeType::Weighted
    } else {
        EdgeType::Unweighted
    };
    let source: Box<dyn EdgeSource> = match matches.value_of("format").unwrap() {
        "binary" => Box::new(BinaryEdgeFile::new(input, edge_type)),
        "text" => Box::new(TextEdgeFile::new(input)),
        "sqlite" => Box::new(SqliteEdges::new(input, edge_type)),
        _ => unreachable!(),
    };
    let mut builder = GridBuilder::new(matches.value_of("OUTPUT").unwrap()).edge_type(edge_type);
    if let Some(vertices) = matches.value_of("vertices") {
        builder = builder.vertices(vertices.parse()?);
    }
    if let Some(partitions) = matches.value_of("partitions") {
        builder = builder.partitions(partitions.parse()?);
    }
    if let Some(budget) = matches.value_of("memory-budget") {
        builder = builder.memory_budget(budget.parse::<u64>()? * GIB, 4, 1);
    }
    if matches.is_present("degree-balanced") {
        builder = builder.balance(Balance::Degree);
    }
    println!("{}", builder.build(source.as_ref())?);
    Ok(())
}

fn handle_info(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let graph = Graph::open(matches.value_of("GRAPH").unwrap())?;
    print!("{}", graph.block_table());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let matches = App::new("gridstream")
        .about("Out-of-core grid streaming graph computation")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("preprocess")
                .about("Partitions an edge list into a grid")
                .arg(Arg::with_name("INPUT").required(true))
                .arg(Arg::with_name("OUTPUT").required(true))
                .arg(
                    Arg::with_name("format")
                        .long("format")
                        .takes_value(true)
                        .possible_values(&["binary", "text", "sqlite"])
                        .default_value("binary"),
                )
                .arg(Arg::with_name("weighted").long("weighted"))
                .arg(
                    Arg::with_name("vertices")
                        .long("vertices")
                        .takes_value(true)
                        .help("Vertex count; defaults to the largest id plus one"),
                )
                .arg(
                    Arg::with_name("partitions")
                        .long("partitions")
                        .short("p")
                        .takes_value(true)
                        .conflicts_with("memory-budget"),
                )
                .arg(
                    Arg::with_name("memory-budget")
                        .long("memory-budget")
                        .takes_value(true)
                        .help("Memory budget in GiB used to choose the grid dimension"),
                )
                .arg(Arg::with_name("degree-balanced").long("degree-balanced")),
        )
        .subcommand(
            SubCommand::with_name("info")
                .about("Displays the grid metadata and block sizes")
                .arg(Arg::with_name("GRAPH").required(true)),
        )
        .get_matches();
    if let Some(matches) = matches.subcommand_matches("preprocess") {
        handle_preprocess(matches)?;
    } else if let Some(matches) = matches.subcommand_matches("info") {
        handle_info(matches)?;
    }
    Ok(())
}

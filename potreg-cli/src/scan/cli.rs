use clap::{Arg, ArgAction, Command, arg, value_parser};

pub const SCAN_CMD: &str = "scan";

pub fn create_scan_cli() -> Command {
    Command::new(SCAN_CMD)
        .about("Scan a genome for potential regions and tally reads inside and outside them")
        .arg_required_else_help(true)
        .arg(arg!(--chromsizes <chromsizes> "Chromosome sizes file (name and length per line)").required(true))
        .arg(
            Arg::new("signal")
                .long("signal")
                .value_name("NAME=PATH")
                .action(ArgAction::Append)
                .required(true)
                .help("Signal reads (bed or bed.gz) for a condition; repeat for replicates and conditions"),
        )
        .arg(
            Arg::new("control")
                .long("control")
                .value_name("NAME=PATH")
                .action(ArgAction::Append)
                .help("Control reads (bed or bed.gz) for a condition"),
        )
        .arg(arg!(--config <config> "TOML file with scan settings; flags override it"))
        .arg(arg!(-p --threads <threads> "Number of worker threads").value_parser(value_parser!(usize)))
        .arg(arg!(--binwidth <binwidth> "Bin width in bp").value_parser(value_parser!(u32)))
        .arg(arg!(--binstep <binstep> "Bin step in bp").value_parser(value_parser!(u32)))
        .arg(arg!(--ignore <ignore> "Bed file of regions no potential region may overlap"))
        .arg(arg!(--stranded "Scan each strand separately"))
        .arg(arg!(--score "Weigh reads by the bed score column"))
        .arg(arg!(-o --output <output> "Output bed file (.gz to compress); stdout when absent"))
}

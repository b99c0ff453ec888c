// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    clap::{value_parser, Arg, ArgAction, ArgMatches, Command},
    log::LevelFilter,
    packed_fs::{LocalRegistry, PackOptions, SourceOptions},
    std::{ffi::OsString, path::PathBuf},
    thiserror::Error,
};

const PACK_ABOUT: &str = "\
Pack files and directories into a resources blob.

Each SOURCE that is a directory contributes everything below it, keyed
relative to the directory. Each SOURCE that is a file is stored under its
file name at the root of the blob.

With --prefix, every entry is stored under the given directory.

With --compress, file content is stored zlib compressed. Readers must use
zlib decompression to load the blob.
";

const GENERATE_ABOUT: &str = "\
Pack files and directories and write Rust source embedding the blob.

The generated file defines a static holding the blob and a function
registering it with the packed-fs default registry. Write it to OUT_DIR from
a build script and pull it in with:

    include!(concat!(env!(\"OUT_DIR\"), \"/resources.rs\"));

then call the registration function early in main().
";

#[derive(Debug, Error)]
pub enum PackfsError {
    #[error("argument parsing error: {0}")]
    Clap(#[from] clap::Error),

    #[error("{0}")]
    PackedFs(#[from] packed_fs::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid sub-command: {0}")]
    InvalidSubCommand(String),
}

pub type Result<T> = std::result::Result<T, PackfsError>;

fn source_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("source")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf))
                .help("Files or directories to pack"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path of file to write"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .help("Directory to store all packed entries under"),
        )
        .arg(
            Arg::new("compress")
                .long("compress")
                .action(ArgAction::SetTrue)
                .help("Store file content compressed"),
        )
}

pub fn build_cli() -> Command {
    let app = Command::new("packfs")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Pack directory trees into embeddable resource blobs")
        .arg_required_else_help(true);

    let app = app.arg(
        Arg::new("verbose")
            .long("verbose")
            .short('v')
            .global(true)
            .action(ArgAction::Count)
            .help("Increase logging verbosity. Can be specified multiple times"),
    );

    let app = app.subcommand(source_args(
        Command::new("pack")
            .about("Pack files into a resources blob")
            .long_about(PACK_ABOUT),
    ));

    let app = app.subcommand(
        source_args(
            Command::new("generate")
                .about("Pack files into Rust source embedding the blob")
                .long_about(GENERATE_ABOUT),
        )
        .arg(
            Arg::new("function-name")
                .long("function-name")
                .help("Name of the generated registration function"),
        )
        .arg(
            Arg::new("static-name")
                .long("static-name")
                .help("Name of the generated static holding the blob"),
        )
        .arg(
            Arg::new("crate-path")
                .long("crate-path")
                .help("Path through which generated code reaches the packed-fs crate"),
        ),
    );

    let app = app.subcommand(
        Command::new("list")
            .about("List the entries of a resources blob")
            .arg(
                Arg::new("blob")
                    .required(true)
                    .value_parser(value_parser!(PathBuf))
                    .help("Path of resources blob to read"),
            ),
    );

    app.subcommand(
        Command::new("extract")
            .about("Extract entries of a resources blob to the filesystem")
            .arg(
                Arg::new("blob")
                    .required(true)
                    .value_parser(value_parser!(PathBuf))
                    .help("Path of resources blob to read"),
            )
            .arg(
                Arg::new("dest")
                    .required(true)
                    .value_parser(value_parser!(PathBuf))
                    .help("Directory to write files to"),
            )
            .arg(
                Arg::new("path")
                    .long("path")
                    .default_value("/")
                    .help("Entry to extract, along with everything below it"),
            ),
    )
}

fn init_logging(matches: &ArgMatches) {
    let log_level = match matches.get_count("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();
}

fn sources(args: &ArgMatches) -> Vec<PathBuf> {
    args.get_many::<PathBuf>("source")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn output(args: &ArgMatches) -> PathBuf {
    args.get_one::<PathBuf>("output")
        .cloned()
        .expect("output argument is required")
}

fn pack_options(args: &ArgMatches) -> PackOptions {
    let mut options = PackOptions::default().compress(args.get_flag("compress"));

    if let Some(prefix) = args.get_one::<String>("prefix") {
        options = options.prefix(prefix);
    }

    options
}

fn command_pack(args: &ArgMatches) -> Result<()> {
    let output = output(args);
    packed_fs::pack_to_file(&sources(args), &output, &pack_options(args))?;

    println!("wrote {}", output.display());

    Ok(())
}

fn command_generate(args: &ArgMatches) -> Result<()> {
    let mut source_options = SourceOptions::default();

    if let Some(name) = args.get_one::<String>("function-name") {
        source_options = source_options.function_name(name);
    }
    if let Some(name) = args.get_one::<String>("static-name") {
        source_options = source_options.static_name(name);
    }
    if let Some(path) = args.get_one::<String>("crate-path") {
        source_options = source_options.crate_path(path);
    }

    let output = output(args);
    packed_fs::pack_to_source_file(
        &sources(args),
        &output,
        &pack_options(args),
        &source_options,
    )?;

    println!("wrote {}", output.display());

    Ok(())
}

fn load_blob(args: &ArgMatches) -> Result<LocalRegistry> {
    let path = args
        .get_one::<PathBuf>("blob")
        .expect("blob argument is required");

    let registry = LocalRegistry::new();
    registry.load(path, None)?;

    Ok(registry)
}

fn command_list(args: &ArgMatches) -> Result<()> {
    let registry = load_blob(args)?;

    let stdout = std::io::stdout();
    registry.write_listing(&mut stdout.lock())?;

    Ok(())
}

fn command_extract(args: &ArgMatches) -> Result<()> {
    let registry = load_blob(args)?;

    let dest = args
        .get_one::<PathBuf>("dest")
        .expect("dest argument is required");
    let path = args
        .get_one::<String>("path")
        .expect("path argument has a default value");

    let count = registry.export(path, dest)?;
    println!("extracted {} files to {}", count, dest.display());

    Ok(())
}

pub fn run_cli() -> Result<()> {
    run_cli_from(std::env::args_os())
}

pub fn run_cli_from<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = match build_cli().try_get_matches_from(args) {
        Ok(matches) => matches,
        // Help and version requests are not failures.
        Err(e) if !e.use_stderr() => {
            e.print()?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    init_logging(&matches);

    match matches.subcommand() {
        Some(("pack", args)) => command_pack(args),
        Some(("generate", args)) => command_generate(args),
        Some(("list", args)) => command_list(args),
        Some(("extract", args)) => command_extract(args),
        Some((command, _)) => Err(PackfsError::InvalidSubCommand(command.to_string())),
        None => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}

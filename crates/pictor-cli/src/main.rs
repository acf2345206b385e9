use pictor_core::codec;
use pictor_core::geom::{Box2, point};
use pictor_core::{Decoded, EncodeOptions, Engine, EngineConfig, Envelope, NodeId, SvgVersion};
use serde::Serialize;
use std::io::{Read, Write};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Pictor(pictor_core::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Pictor(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<pictor_core::Error> for CliError {
    fn from(value: pictor_core::Error) -> Self {
        Self::Pictor(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Normalize,
    Bbox,
    Hit,
    Gc,
    Report,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    out: Option<String>,
    config: Option<String>,
    target_version: Option<SvgVersion>,
    indent: Option<usize>,
    keep_internal: bool,
    envelope: Envelope,
    pretty: bool,
    x: Option<f64>,
    y: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BoxOut {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl From<Box2> for BoxOut {
    fn from(b: Box2) -> Self {
        Self {
            min_x: b.min.x,
            min_y: b.min.y,
            max_x: b.max.x,
            max_y: b.max.y,
        }
    }
}

#[derive(Serialize)]
struct ShapeOut<'a> {
    id: Option<String>,
    tag: &'a str,
    bbox: BoxOut,
}

#[derive(Serialize)]
struct HitOut<'a> {
    x: f64,
    y: f64,
    hit: Option<NodeOut<'a>>,
}

#[derive(Serialize)]
struct NodeOut<'a> {
    id: Option<String>,
    tag: &'a str,
}

fn usage() -> &'static str {
    "pictor\n\
\n\
USAGE:\n\
  pictor [normalize] [--indent <n>] [--target-version 1.1|2] [--keep-internal] [--out <path>] [<path>|-]\n\
  pictor bbox [--pretty] [<path>|-]\n\
  pictor hit --x <x> --y <y> [<path>|-]\n\
  pictor gc [--indent <n>] [--out <path>] [<path>|-]\n\
  pictor report [--pretty] [<path>|-]\n\
\n\
COMMON OPTIONS:\n\
  --config <path.json>   engine configuration merged over the defaults\n\
  --base64, --gzip       storage envelope of the input (and of the output for normalize/gc)\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - bbox, hit and report print JSON; coordinates are in root user space.\n\
  - gc drops generated definitions nothing references any more.\n\
  - Log verbosity is read from PICTOR_LOG (default: warn).\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_f64(text: &str) -> Result<f64, CliError> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(CliError::Usage(usage()))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "normalize" => args.command = Command::Normalize,
            "bbox" => args.command = Command::Bbox,
            "hit" => args.command = Command::Hit,
            "gc" => args.command = Command::Gc,
            "report" => args.command = Command::Report,
            "--pretty" => args.pretty = true,
            "--keep-internal" => args.keep_internal = true,
            "--base64" => args.envelope.base64 = true,
            "--gzip" => args.envelope.gzip = true,
            "--indent" => {
                let n = next_value(&mut it)?;
                args.indent = Some(n.parse::<usize>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--target-version" => {
                let v = next_value(&mut it)?;
                args.target_version =
                    Some(v.parse::<SvgVersion>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--config" => args.config = Some(next_value(&mut it)?.clone()),
            "--out" => args.out = Some(next_value(&mut it)?.clone()),
            "--x" => args.x = Some(parse_f64(next_value(&mut it)?)?),
            "--y" => args.y = Some(parse_f64(next_value(&mut it)?)?),
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    if matches!(args.command, Command::Hit) && (args.x.is_none() || args.y.is_none()) {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<Vec<u8>, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read(path)?),
    }
}

fn load_config(args: &Args) -> Result<EngineConfig, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => EngineConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(v) = args.target_version {
        config.target_version = v;
    }
    Ok(config)
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    } else {
        serde_json::to_writer(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    Ok(())
}

fn write_bytes(bytes: &[u8], out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, bytes)?;
            Ok(())
        }
    }
}

fn node_id(decoded: &Decoded, node: NodeId) -> Option<String> {
    decoded.doc.attr_str(node, "id").map(|v| v.into_owned())
}

fn encode_out(decoded: &Decoded, args: &Args) -> Result<(), CliError> {
    let opts = EncodeOptions {
        indent: args.indent,
        keep_internal: args.keep_internal,
    };
    let bytes = codec::pack(&decoded.encode(&opts), args.envelope)?;
    write_bytes(&bytes, args.out.as_deref())
}

fn run(args: Args) -> Result<(), CliError> {
    let engine = Engine::new().with_config(load_config(&args)?);
    let data = read_input(args.input.as_deref())?;
    let mut decoded = engine.decode(&data, args.envelope)?;

    match args.command {
        Command::Normalize => encode_out(&decoded, &args),
        Command::Gc => {
            let registry = engine.defrefs(&mut decoded.doc, decoded.root);
            tracing::info!(live = registry.len(), "definitions kept");
            encode_out(&decoded, &args)
        }
        Command::Report => write_json(&decoded.report, args.pretty),
        Command::Bbox => {
            let geo = engine.geometry(&decoded.doc);
            let shapes: Vec<ShapeOut<'_>> = decoded
                .doc
                .descendants(decoded.root)
                .into_iter()
                .filter(|n| *n != decoded.root)
                .filter(|n| decoded.doc.ancestor_by_tag(*n, "defs").is_none())
                .filter_map(|n| {
                    let tag = geo.kind(n)?.tag();
                    let bbox = geo.bbox(n, Some(&geo.ancestor_transform(n)))?;
                    Some(ShapeOut {
                        id: node_id(&decoded, n),
                        tag,
                        bbox: bbox.into(),
                    })
                })
                .collect();
            write_json(&shapes, args.pretty)
        }
        Command::Hit => {
            let (x, y) = (args.x.unwrap_or_default(), args.y.unwrap_or_default());
            let geo = engine.geometry(&decoded.doc);
            let hit = geo
                .hit_test(decoded.root, point(x, y), None)
                .map(|n| NodeOut {
                    id: node_id(&decoded, n),
                    tag: decoded.doc.tag(n).unwrap_or_default(),
                });
            write_json(&HitOut { x, y, hit }, args.pretty)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PICTOR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    init_tracing();

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        std::iter::once("pictor")
            .chain(items.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn hit_requires_both_coordinates() {
        assert!(matches!(
            parse_args(&argv(&["hit", "--x", "1", "a.svg"])),
            Err(CliError::Usage(_))
        ));
        let args = parse_args(&argv(&["hit", "--x", "1", "--y", "2.5", "a.svg"])).unwrap();
        assert_eq!((args.x, args.y), (Some(1.0), Some(2.5)));
        assert_eq!(args.input.as_deref(), Some("a.svg"));
    }

    #[test]
    fn envelope_and_version_flags() {
        let args = parse_args(&argv(&["--gzip", "--base64", "--target-version", "2", "-"])).unwrap();
        assert!(matches!(args.command, Command::Normalize));
        assert!(args.envelope.gzip && args.envelope.base64);
        assert_eq!(args.target_version, Some(SvgVersion::V2));
        assert_eq!(args.input.as_deref(), Some("-"));
        assert!(parse_args(&argv(&["--target-version", "3"])).is_err());
        assert!(parse_args(&argv(&["--bogus"])).is_err());
    }
}

use crate::{Error, Result};

/// Options for the `run` command; values are `None` when not provided on CLI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub device: Option<String>,
    pub baud: Option<u32>,
    pub cols: Option<u8>,
    pub headless: bool,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
}

/// Options for `send`: one frame to the device, as the master would send it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    pub body: String,
    pub device: Option<String>,
    pub baud: Option<u32>,
    pub wait_ms: u64,
}

pub const DEFAULT_SEND_WAIT_MS: u64 = 500;

/// Parsed command-line intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunOptions),
    Send(SendOptions),
    ShowHelp,
    ShowVersion,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut iter = args.iter();
        match iter.next().map(|s| s.as_str()) {
            None => Ok(Command::Run(RunOptions::default())),
            Some("run") => Ok(Command::Run(parse_run_options(&mut iter)?)),
            Some("send") => Ok(Command::Send(parse_send_options(&mut iter)?)),
            Some("--help") | Some("-h") => Ok(Command::ShowHelp),
            Some("--version") | Some("-V") => Ok(Command::ShowVersion),
            Some(flag) if flag.starts_with('-') => {
                // `run` may be omitted; reparse everything as run flags.
                let mut iter = args.iter();
                Ok(Command::Run(parse_run_options(&mut iter)?))
            }
            Some(cmd) => Err(Error::InvalidArgs(format!(
                "unknown command '{cmd}', try --help"
            ))),
        }
    }

    pub fn help() -> &'static str {
        concat!(
            "cristalliq - serial display controller for a 4-line LCD\n",
            "\n",
            "USAGE:\n",
            "  cristalliq run [--device <path>] [--baud <number>] [--cols <number>] [--headless]\n",
            "                 [--log-level <level>] [--log-file <path>]\n",
            "  cristalliq send <body> [--device <path>] [--baud <number>] [--wait-ms <number>]\n",
            "  cristalliq --help\n",
            "  cristalliq --version\n",
            "\n",
            "OPTIONS:\n",
            "  --device <path>     Serial device path (default: /dev/ttyUSB0)\n",
            "  --baud <number>     Baud rate (default: 9600)\n",
            "  --cols <number>     Display columns (default: 20)\n",
            "  --headless          Keep rows in memory instead of driving the LCD\n",
            "  --log-level <lvl>   error|warn|info|debug|trace (default: info)\n",
            "  --log-file <path>   Append logs to this file as well as stderr\n",
            "  --wait-ms <number>  How long `send` waits for a reply (default: 500)\n",
            "  -h, --help          Show this help\n",
            "  -V, --version       Show version\n",
            "\n",
            "The body of `send` is `code|text|ttl`, e.g. `200|Room A|3000`.\n",
        )
    }

    pub fn print_help() {
        println!("{}", Self::help());
    }
}

fn parse_run_options(iter: &mut std::slice::Iter<String>) -> Result<RunOptions> {
    let mut opts = RunOptions::default();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--device" => opts.device = Some(take_value(flag, iter)?),
            "--baud" => opts.baud = Some(take_number(flag, iter, "baud")?),
            "--cols" => opts.cols = Some(take_number(flag, iter, "cols")?),
            "--headless" => opts.headless = true,
            "--log-level" => opts.log_level = Some(take_value(flag, iter)?),
            "--log-file" => opts.log_file = Some(take_value(flag, iter)?),
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown flag '{other}', try --help"
                )));
            }
        }
    }

    Ok(opts)
}

fn parse_send_options(iter: &mut std::slice::Iter<String>) -> Result<SendOptions> {
    let mut body = None;
    let mut opts = SendOptions {
        body: String::new(),
        device: None,
        baud: None,
        wait_ms: DEFAULT_SEND_WAIT_MS,
    };

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--device" => opts.device = Some(take_value(arg, iter)?),
            "--baud" => opts.baud = Some(take_number(arg, iter, "baud")?),
            "--wait-ms" => opts.wait_ms = take_number(arg, iter, "wait-ms")?,
            flag if flag.starts_with("--") => {
                return Err(Error::InvalidArgs(format!(
                    "unknown flag '{flag}', try --help"
                )));
            }
            value if body.is_none() => body = Some(value.to_string()),
            extra => {
                return Err(Error::InvalidArgs(format!(
                    "unexpected argument '{extra}'; quote the body if it has spaces"
                )));
            }
        }
    }

    opts.body = body.ok_or_else(|| Error::InvalidArgs("send needs a message body".into()))?;
    Ok(opts)
}

fn take_value(flag: &str, iter: &mut std::slice::Iter<String>) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| Error::InvalidArgs(format!("expected a value after {flag}")))
}

fn take_number<T: std::str::FromStr>(
    flag: &str,
    iter: &mut std::slice::Iter<String>,
    name: &str,
) -> Result<T> {
    take_value(flag, iter)?
        .parse()
        .map_err(|_| Error::InvalidArgs(format!("{name} must be a positive integer")))
}

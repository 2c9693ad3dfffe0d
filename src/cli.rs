//! CLI argument definitions using clap derive macros.

use std::ops::Range;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Read publication resources from directories, zip containers and HTTP
/// servers.
///
/// A SOURCE is a directory, a zip file such as an EPUB, or an http(s) base
/// URL.
#[derive(Parser, Debug)]
#[command(name = "pubfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// HTTP read timeout in seconds (1-3600)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// User agent sent with HTTP requests
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Password of an encrypted zip container
    #[arg(long, global = true, env = "PUBFETCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the resources of a source
    Ls {
        /// Directory, zip file or base URL
        source: String,
    },

    /// Write the bytes of a resource to stdout
    Cat {
        /// Directory, zip file or base URL
        source: String,
        /// Href of the resource
        href: String,
        /// Byte range to read, as START..END
        #[arg(long, value_parser = parse_range)]
        range: Option<Range<u64>>,
        /// Read through a buffer of this many bytes, or of the configured
        /// `buffer_size` when no value is given
        #[arg(long, value_name = "BYTES", value_parser = clap::value_parser!(u64).range(1..))]
        buffer: Option<Option<u64>>,
    },

    /// Print the text content of an HTML or plain text resource
    Text {
        /// Directory, zip file or base URL
        source: String,
        /// Href of the resource
        href: String,
    },

    /// Download a URL to a file with a progress bar
    Download {
        /// URL to download
        url: String,
        /// Output file
        output: PathBuf,
    },
}

/// Parses `START..END` into a byte range.
pub fn parse_range(value: &str) -> Result<Range<u64>, String> {
    let (start, end) = value
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got '{value}'"))?;
    let start = start
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid range start '{start}': {e}"))?;
    let end = end
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid range end '{end}': {e}"))?;
    if end < start {
        return Err(format!("range end {end} is before start {start}"));
    }
    Ok(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_ls_parses_source() {
        let args = Args::try_parse_from(["pubfetch", "ls", "book.epub"]).unwrap();
        assert!(matches!(args.command, Command::Ls { ref source } if source == "book.epub"));
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_cat_parses_range_and_buffer() {
        let args = Args::try_parse_from([
            "pubfetch",
            "cat",
            "book.epub",
            "/mimetype",
            "--range",
            "0..11",
            "--buffer",
            "4096",
        ])
        .unwrap();
        let Command::Cat { range, buffer, .. } = args.command else {
            panic!("expected cat");
        };
        assert_eq!(range, Some(0..11));
        assert_eq!(buffer, Some(Some(4096)));
    }

    #[test]
    fn test_cli_buffer_without_value_uses_config() {
        let args = Args::try_parse_from(["pubfetch", "cat", "dir", "/a", "--buffer"]).unwrap();
        let Command::Cat { buffer, .. } = args.command else {
            panic!("expected cat");
        };
        assert_eq!(buffer, Some(None));
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["pubfetch", "ls", "dir", "-vv", "--read-timeout", "10"])
            .unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.read_timeout, Some(10));
    }

    #[test]
    fn test_cli_zero_buffer_rejected() {
        let result = Args::try_parse_from(["pubfetch", "cat", "dir", "/a", "--buffer", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_missing_subcommand_is_error() {
        assert!(Args::try_parse_from(["pubfetch"]).is_err());
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("5..60"), Ok(5..60));
        assert!(parse_range("60..5").is_err());
        assert!(parse_range("5-60").is_err());
        assert!(parse_range("a..b").is_err());
    }
}

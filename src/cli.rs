use clap::Parser;
use std::path::PathBuf;

/// Options left unset fall back to the config file, then to built-in
/// defaults.
#[derive(Parser, Debug)]
#[command(
    name = "pcmbars",
    about = "Convert raw pcm_s16le audio into frequency bar values, one line per frame"
)]
pub struct Cli {
    /// Input PCM file, "-" reads standard input
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Output file, "-" writes standard output
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,

    /// Bars per channel (2-200) [default: 10]
    #[arg(short, long)]
    pub bars: Option<usize>,

    /// Output frames per second [default: 25]
    #[arg(short = 'f', long = "framerate")]
    pub frame_rate: Option<f64>,

    /// Stereo output: the right channel bars followed by the left channel bars
    #[arg(short = 'S', long)]
    pub stereo: bool,

    /// Smoothing between 0 (fast, noisy) and 1 (slow, smooth) [default: 0.77]
    #[arg(short = 'n', long)]
    pub noise_reduction: Option<f64>,

    /// Automatic sensitivity, 0 disables it [default: 0]
    #[arg(short, long)]
    pub autosens: Option<u32>,

    /// Lowest frequency shown, in Hz [default: 50]
    #[arg(long = "low-cutoff")]
    pub low_cut_off: Option<u32>,

    /// Highest frequency shown, in Hz [default: 10000]
    #[arg(long = "high-cutoff")]
    pub high_cut_off: Option<u32>,

    /// Input sample rate in Hz [default: 44100]
    #[arg(short = 'r', long = "rate")]
    pub sample_rate: Option<u32>,

    /// Input channel count, 1 or 2 [default: 2]
    #[arg(short, long)]
    pub channels: Option<u16>,

    /// Samples per channel handed to the engine per execution [default: 512]
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Scale applied to engine output before printing [default: 100]
    #[arg(long)]
    pub height: Option<f64>,

    /// Print the cut-off frequency of every bar as the first line
    #[arg(short = 'F', long = "print-freqs")]
    pub print_cut_offs: bool,

    /// Config file (TOML). Defaults to ./pcmbars.toml or the user config dir
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_short_options() {
        let cli = Cli::try_parse_from([
            "pcmbars", "-b", "20", "-f", "30", "-S", "-a", "1", "-F", "-o", "bars.txt", "in.raw",
        ])
        .unwrap();

        assert_eq!(cli.bars, Some(20));
        assert_eq!(cli.frame_rate, Some(30.0));
        assert!(cli.stereo);
        assert_eq!(cli.autosens, Some(1));
        assert!(cli.print_cut_offs);
        assert_eq!(cli.output, PathBuf::from("bars.txt"));
        assert_eq!(cli.input, PathBuf::from("in.raw"));
        assert_eq!(cli.sample_rate, None);
    }

    #[test]
    fn test_defaults_to_standard_streams() {
        let cli = Cli::try_parse_from(["pcmbars"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("-"));
        assert_eq!(cli.output, PathBuf::from("-"));
        assert!(!cli.stereo);
    }
}

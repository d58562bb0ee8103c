use clap::{ArgAction, Parser};
use std::path::PathBuf;
use timelapse_engine::config::{DEFAULT_EXTENSION, DEFAULT_PORT, DEFAULT_REMOTE_FOLDER, DEFAULT_USER};

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    version,
    disable_version_flag = true,
    about = "Download Bambu timelapses from printer FTP server.",
    long_about = "Download Bambu timelapses from printer FTP server.\n\
                  \n\
                  Connects to the printer over implicit FTPS, lists the timelapse folder\n\
                  and downloads every video that is not already in the download directory.\n\
                  Files are fetched one at a time; a failing file is logged and skipped."
)]
pub struct CliArgs {
    /// Printer IP address or host name
    #[arg(long, help = "IP address or host name of the printer")]
    pub ip: String,

    #[arg(long, default_value_t = DEFAULT_PORT, help = "Implicit FTPS port of the printer")]
    pub port: u16,

    #[arg(long, default_value = DEFAULT_USER, help = "FTP user name")]
    pub user: String,

    /// Printer access code
    #[arg(
        long,
        env = "BAMBU_ACCESS_CODE",
        hide_env_values = true,
        default_value = "",
        help = "FTP password (the printer's LAN access code)"
    )]
    pub password: String,

    #[arg(
        long = "download_dir",
        help = "Directory receiving the videos (default: ./timelapse next to the executable)"
    )]
    pub download_dir: Option<PathBuf>,

    #[arg(
        long = "ftp_timelapse_folder",
        default_value = DEFAULT_REMOTE_FOLDER,
        help = "Folder on the printer holding the timelapses"
    )]
    pub ftp_timelapse_folder: String,

    #[arg(
        short = 'd',
        long = "delete_files_from_sd_card_after_download",
        help = "Delete each file from the printer after it was downloaded"
    )]
    pub delete_files_from_sd_card_after_download: bool,

    #[arg(
        long,
        default_value = DEFAULT_EXTENSION,
        help = "Extension of the video files to download"
    )]
    pub extension: String,

    #[arg(
        long = "log_dir",
        help = "Root of the log directory (default: ./logs next to the executable)"
    )]
    pub log_dir: Option<PathBuf>,

    /// Maximum log file size with optional unit (B, KB, MB, GB)
    #[arg(
        long = "log_max_size",
        default_value = "104857",
        help = "Rotate the log file once it reaches this size. Examples: \"100KB\", \"1MB\""
    )]
    pub log_max_size: String,

    #[arg(
        long = "log_backups",
        default_value_t = 3,
        help = "Number of rotated log files to keep"
    )]
    pub log_backups: usize,

    #[arg(long = "no_progress", help = "Do not draw progress bars")]
    pub no_progress: bool,

    #[arg(short = 'v', long = "version", action = ArgAction::Version, help = "Print version")]
    pub version: Option<bool>,
}

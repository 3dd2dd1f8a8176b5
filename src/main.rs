use std::process::ExitCode;

use log::{error, info};

use rpe::{Config, Flags};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let flags = Flags::parse();
    if let Err(e) = flags.validate() {
        error!("{}", e);
        eprintln!("{}", Flags::usage());
        return ExitCode::FAILURE;
    }

    info!("DNS Suffix: {} RPE Port: {}", flags.dns_suffix, flags.port);
    info!("Remote Provisioning Extension (RPE) starting ...");

    let config = Config::from(&flags);
    match rpe::send_ack(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error sending Ack packet: {}", e);
            ExitCode::FAILURE
        }
    }
}

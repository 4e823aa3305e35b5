use std::env;

#[tokio::main]
async fn main() {
    env_logger::init();

    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = realkredit::api::run_http_server(port).await {
                log::error!("server error: {e}");
                std::process::exit(1);
            }
        }
        Some("calc") => {
            let cli_args = std::iter::once(raw_args[0].clone())
                .chain(raw_args[2..].iter().cloned());
            match realkredit::api::run_cli_calculation(cli_args) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(2);
                }
            }
        }
        _ => {
            eprintln!("Usage: realkredit serve [port]");
            eprintln!("       realkredit calc --property-value <N> --downpayment <N> [options]");
            std::process::exit(1);
        }
    }
}

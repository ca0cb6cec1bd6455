pub mod commands;

use crate::cli::commands::{Commands, SessionAction};
use crate::config::AppConfig;
use crate::db::{
    get_connection,
    service::{DbService, SessionClose},
};

pub async fn run_cli(command: Commands, config_path: String) {
    let config = AppConfig::load(&config_path).expect("Failed to load config");

    match command {
        Commands::Serve => {
            panic!("Serve command should be intercepted by main.rs to boot actix-web");
        }
        Commands::Session { action } => {
            let pool = get_connection(&config.database).expect("DB error");
            let conn = pool.lock().unwrap();

            match action {
                SessionAction::List => match DbService::list_sessions(&conn, 50) {
                    Ok(sessions) => {
                        if sessions.is_empty() {
                            println!("No sessions found.");
                        } else {
                            println!(
                                "{:<38} | {:<20} | {:<8} | {:<8} | {}",
                                "ID", "Started At", "Device", "Messages", "Open"
                            );
                            println!(
                                "{:-<38}-+-{:-<20}-+-{:-<8}-+-{:-<8}-+-{:-<5}",
                                "", "", "", "", ""
                            );
                            for s in sessions {
                                println!(
                                    "{:<38} | {:<20} | {:<8} | {:<8} | {}",
                                    s.id.to_string(),
                                    s.start_time.format("%Y-%m-%d %H:%M:%S"),
                                    s.device_type.as_deref().unwrap_or("unknown"),
                                    s.messages_count,
                                    s.end_time.is_none(),
                                );
                            }
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                },
                SessionAction::End { id } => match DbService::end_session(&conn, id) {
                    Ok(SessionClose::Closed) => println!("Ended session {}", id),
                    Ok(SessionClose::AlreadyEnded) => {
                        println!("Session {} was already ended", id)
                    }
                    Ok(SessionClose::NotFound) => eprintln!("Session {} not found.", id),
                    Err(e) => eprintln!("Error: {}", e),
                },
            }
        }
    }
}

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::{
        ValueParser,
        styling::{AnsiColor, Effects, Styles},
    },
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

fn validator_secret() -> ValueParser {
    ValueParser::from(move |secret: &str| -> std::result::Result<String, String> {
        if secret.len() < 32 {
            Err("cookie secret must be at least 32 bytes".to_string())
        } else {
            Ok(secret.to_string())
        }
    })
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    Command::new("tessera")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("TESSERA_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .long_help(
                    "Database connection string. Without it sessions are kept in memory and lost on restart.",
                )
                .env("TESSERA_DSN"),
        )
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL, used for CORS and the cookie Secure flag")
                .env("TESSERA_FRONTEND_BASE_URL")
                .required(true),
        )
        .arg(
            Arg::new("identity-url")
                .long("identity-url")
                .help("Identity provider base URL, example: https://<project>.supabase.co")
                .env("TESSERA_IDENTITY_URL")
                .required(true),
        )
        .arg(
            Arg::new("identity-anon-key")
                .long("identity-anon-key")
                .help("Identity provider anon (public) API key")
                .env("TESSERA_IDENTITY_ANON_KEY")
                .required(true),
        )
        .arg(
            Arg::new("cookie-secret")
                .long("cookie-secret")
                .help("Secret used to sign session cookies (at least 32 bytes)")
                .env("TESSERA_COOKIE_SECRET")
                .required(true)
                .value_parser(validator_secret()),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session lifetime in seconds")
                .default_value("43200")
                .env("TESSERA_SESSION_TTL_SECONDS")
                .value_parser(
                    clap::value_parser!(i64).range(60..=crate::api::state::MAX_SESSION_TTL_SECONDS),
                ),
        )
        .arg(
            Arg::new("admin-email")
                .long("admin-email")
                .help("Admin email for the in-memory admin directory, repeatable or comma separated")
                .env("TESSERA_ADMIN_EMAILS")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("TESSERA_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

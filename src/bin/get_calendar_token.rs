use event_registrar::components::google_calendar::credentials::{CALENDAR_SCOPE, DEFAULT_TOKEN_URI};
use event_registrar::components::google_calendar::TokenManager;
use event_registrar::config::Config;
use event_registrar::error::{config_error, other_error, AppResult};
use url::Url;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const REDIRECT_URI: &str = "http://localhost:8080";
const LISTEN_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> miette::Result<()> {
    run().await?;
    Ok(())
}

async fn run() -> AppResult<()> {
    // Load configuration
    let config = Config::load()?;

    let client_id = config
        .google_client_id
        .clone()
        .ok_or_else(|| config_error("GOOGLE_CLIENT_ID must be set to request a token"))?;
    let client_secret = config
        .google_client_secret
        .clone()
        .ok_or_else(|| config_error("GOOGLE_CLIENT_SECRET must be set to request a token"))?;

    // Generate random state for security
    let state = uuid::Uuid::new_v4().to_string();

    let auth_url = Url::parse_with_params(
        AUTH_URL,
        &[
            ("client_id", client_id.as_str()),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("scope", CALENDAR_SCOPE),
            ("state", state.as_str()),
        ],
    )
    .map_err(|e| other_error(&format!("Failed to build authorization URL: {}", e)))?;

    // Open browser for authorization
    println!("Opening browser for Google Calendar authorization...");
    if webbrowser::open(auth_url.as_str()).is_err() {
        println!("Could not open a browser. Visit this URL instead:\n{}", auth_url);
    }

    // Start local server to receive the callback
    let server = tiny_http::Server::http(LISTEN_ADDR)
        .map_err(|e| other_error(&format!("Failed to listen on {}: {}", LISTEN_ADDR, e)))?;
    println!("Waiting for authorization callback...");

    let request = server.recv()?;
    let callback = Url::parse(REDIRECT_URI)
        .and_then(|base| base.join(request.url()))
        .map_err(|e| other_error(&format!("Invalid callback URL: {}", e)))?;

    let param = |name: &str| {
        callback
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        request.respond(tiny_http::Response::from_string("Authorization was denied."))?;
        return Err(other_error(&format!("Authorization failed: {}", error)));
    }
    if param("state").as_deref() != Some(state.as_str()) {
        request.respond(tiny_http::Response::from_string("State mismatch, try again."))?;
        return Err(other_error("State parameter in callback does not match"));
    }
    let code = param("code")
        .ok_or_else(|| other_error("No authorization code found in callback"))?;

    // Exchange code for tokens
    let token_manager = TokenManager::default();
    let mut creds = token_manager
        .exchange_code(DEFAULT_TOKEN_URI, &client_id, &client_secret, &code, REDIRECT_URI)
        .await?;
    if creds.scopes.is_empty() {
        creds.scopes = vec![CALENDAR_SCOPE.to_string()];
    }

    creds.save(&config.token_file)?;

    // Send success response to browser
    let response =
        tiny_http::Response::from_string("Authorization successful! You can close this window.");
    request.respond(response)?;

    println!("Token successfully saved to {}", config.token_file.display());

    Ok(())
}

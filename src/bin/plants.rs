use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use plant_tracker::error::ErrorResponse;
use plant_tracker::models::{CreatePlantRequest, PlantListResponse, PlantView};
use plant_tracker::user_models::{LoginRequest, LoginResponse, RegisterRequest, UserResponse};
use prettytable::{Cell, Row, Table};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

const SESSION_FILE: &str = ".session";

#[derive(Parser)]
#[command(name = "plants")]
#[command(about = "A CLI tool for keeping your plants watered", long_about = None)]
struct Cli {
    #[arg(long, env = "PLANTS_API_URL", default_value = "http://localhost:3000", help = "Plant tracker server URL")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a new account")]
    Signup {
        #[arg(short, long, help = "Username")]
        username: String,

        #[arg(short, long, help = "Email address for watering reminders")]
        email: String,

        #[arg(short, long, help = "Password")]
        password: String,
    },

    #[command(about = "Log in with your username or email")]
    Login {
        #[arg(short, long, help = "Username or email")]
        login: String,

        #[arg(short, long, help = "Password")]
        password: String,
    },

    #[command(about = "Log out of your account")]
    Logout,

    #[command(about = "Show current user")]
    Whoami,

    #[command(about = "Add a plant")]
    Add {
        #[arg(short, long, help = "Plant name")]
        name: String,

        #[arg(short, long, help = "Days between waterings")]
        days: i32,

        #[arg(short, long, help = "Date last watered, YYYY-MM-DD (default: today)")]
        last_watered: Option<String>,
    },

    #[command(about = "List your plants and when they need water")]
    List,

    #[command(about = "Mark a plant as watered today")]
    Water {
        #[arg(help = "Plant ID")]
        id: String,
    },

    #[command(about = "Delete a plant")]
    Delete {
        #[arg(help = "Plant ID")]
        id: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct Session {
    token: String,
    user_id: String,
    username: String,
}

impl Session {
    fn save(&self) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(SESSION_FILE, json)?;
        Ok(())
    }

    fn load() -> Option<Self> {
        if Path::new(SESSION_FILE).exists() {
            let data = fs::read_to_string(SESSION_FILE).ok()?;
            serde_json::from_str(&data).ok()
        } else {
            None
        }
    }

    fn clear() -> Result<()> {
        if Path::new(SESSION_FILE).exists() {
            fs::remove_file(SESSION_FILE)?;
        }
        Ok(())
    }
}

struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder.bearer_auth(&session.token)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = Client::new(cli.server);

    if let Err(e) = run_command(&client, cli.command).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_command(client: &Client, command: Commands) -> Result<()> {
    match command {
        Commands::Signup { username, email, password } => {
            signup(client, username, email, password).await?;
        }
        Commands::Login { login, password } => {
            log_in(client, login, password).await?;
        }
        Commands::Logout => {
            logout(client).await?;
        }
        Commands::Whoami => {
            whoami();
        }
        Commands::Add { name, days, last_watered } => {
            let session = require_login()?;
            add_plant(client, &session, name, days, last_watered).await?;
        }
        Commands::List => {
            let session = require_login()?;
            list_plants(client, &session).await?;
        }
        Commands::Water { id } => {
            let session = require_login()?;
            water_plant(client, &session, id).await?;
        }
        Commands::Delete { id } => {
            let session = require_login()?;
            delete_plant(client, &session, id).await?;
        }
    }

    Ok(())
}

/// Turns a non-success response into an error carrying the server's message.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        Session::clear().ok();
    }
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(_) => status.to_string(),
    };
    bail!("{}", message)
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    check(response)
        .await?
        .json()
        .await
        .context("Failed to parse response")
}

async fn send(builder: RequestBuilder) -> Result<Response> {
    builder
        .send()
        .await
        .context("Failed to connect to plant tracker. Is the server running?")
}

async fn signup(client: &Client, username: String, email: String, password: String) -> Result<()> {
    let request = RegisterRequest { username, email, password };
    let user: UserResponse = parse(send(client.http.post(client.url("/users")).json(&request)).await?).await?;

    println!("✅ Account created successfully!");
    println!("👤 Username: {}", user.username);
    println!("📧 Email: {}", user.email);
    println!("\n💡 You can now log in using: plants login -l {} -p <password>", user.username);

    Ok(())
}

async fn log_in(client: &Client, login: String, password: String) -> Result<()> {
    let request = LoginRequest { login, password };
    let response: LoginResponse =
        parse(send(client.http.post(client.url("/sessions")).json(&request)).await?).await?;

    let session = Session {
        token: response.token,
        user_id: response.user_id,
        username: response.username,
    };
    session.save()?;

    println!("✅ Login successful!");
    println!("👤 Welcome back, {}!", session.username);

    Ok(())
}

async fn logout(client: &Client) -> Result<()> {
    if let Some(session) = Session::load() {
        // The local session is dropped even if the server is unreachable.
        let request = client.authed(client.http.delete(client.url("/sessions")), &session);
        if let Err(e) = request.send().await {
            eprintln!("⚠️  Could not reach server: {}", e);
        }
    }
    Session::clear()?;
    println!("✅ Logged out successfully!");
    Ok(())
}

fn require_login() -> Result<Session> {
    Session::load()
        .ok_or_else(|| anyhow::anyhow!("You must be logged in. Use: plants login -l <username> -p <password>"))
}

fn whoami() {
    if let Some(session) = Session::load() {
        println!("👤 Logged in as: {}", session.username);
        println!("🆔 User ID: {}", session.user_id);
    } else {
        println!("❌ Not logged in");
        println!("💡 Use 'plants login -l <username> -p <password>' to log in");
    }
}

async fn add_plant(
    client: &Client,
    session: &Session,
    name: String,
    days: i32,
    last_watered: Option<String>,
) -> Result<()> {
    let last_watered = last_watered
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", raw))
        })
        .transpose()?;

    let request = CreatePlantRequest {
        name,
        days_between_watering: days,
        last_watered,
    };
    let plant: PlantView = parse(
        send(client.authed(client.http.post(client.url("/plants")), session).json(&request)).await?,
    )
    .await?;

    println!("✅ Plant added!");
    println!("🌱 Name: {}", plant.name);
    println!("💧 Water every {} day(s), next on {}", plant.days_between_watering, plant.next_watering);
    println!("🆔 Plant ID: {}", plant.id);

    Ok(())
}

async fn list_plants(client: &Client, session: &Session) -> Result<()> {
    let result: PlantListResponse =
        parse(send(client.authed(client.http.get(client.url("/plants")), session)).await?).await?;

    if result.plants.is_empty() {
        println!("📭 No plants yet.");
        println!("💡 Use 'plants add -n <name> -d <days>' to add one");
        return Ok(());
    }

    let today = Local::now().date_naive();
    println!("\n🌿 Your Plants ({})\n", result.plants.len());

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Every"),
        Cell::new("Last Watered"),
        Cell::new("Next Watering"),
        Cell::new(""),
    ]));

    for plant in result.plants {
        let status = if today >= plant.next_watering { "💧 water now" } else { "" };
        table.add_row(Row::new(vec![
            Cell::new(&plant.id),
            Cell::new(&plant.name),
            Cell::new(&format!("{}d", plant.days_between_watering)),
            Cell::new(&plant.last_watered.to_string()),
            Cell::new(&plant.next_watering.to_string()),
            Cell::new(status),
        ]));
    }

    table.printstd();
    println!();

    Ok(())
}

async fn water_plant(client: &Client, session: &Session, id: String) -> Result<()> {
    let path = format!("/plants/{}/water", id);
    let plant: PlantView = parse(send(client.authed(client.http.post(client.url(&path)), session)).await?).await?;

    println!("✅ Watered '{}'!", plant.name);
    println!("📅 Next watering: {}", plant.next_watering);

    Ok(())
}

async fn delete_plant(client: &Client, session: &Session, id: String) -> Result<()> {
    let path = format!("/plants/{}", id);
    check(send(client.authed(client.http.delete(client.url(&path)), session)).await?).await?;

    println!("✅ Plant {} deleted", id);

    Ok(())
}

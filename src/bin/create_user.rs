use bcrypt::{hash, DEFAULT_COST};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::io::{self, Write};

fn prompt(label: &str) -> io::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Chat Backend - Create User");
    println!("==========================");

    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set in .env file")?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    let first_name = prompt("First name")?;
    let last_name = prompt("Last name")?;
    if first_name.is_empty() || last_name.is_empty() {
        eprintln!("First and last name are required");
        return Ok(());
    }

    let email = prompt("Email address")?.to_lowercase();
    if email.is_empty() || !email.contains('@') {
        eprintln!("Invalid email address");
        return Ok(());
    }

    let existing_user = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

    if existing_user.is_some() {
        eprintln!("User already exists");
        return Ok(());
    }

    print!("Password: ");
    io::stdout().flush()?;
    let password = rpassword::read_password()?;

    if password.chars().count() < 6 {
        eprintln!("Password must be at least 6 characters long");
        return Ok(());
    }

    print!("Password (again): ");
    io::stdout().flush()?;
    let password_confirm = rpassword::read_password()?;

    if password != password_confirm {
        eprintln!("Passwords don't match");
        return Ok(());
    }

    let password_hash = hash(&password, DEFAULT_COST)?;

    let result = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (first_name, last_name, email, password_hash, created_at, updated_at)
         VALUES ($1, $2, $3, $4, NOW(), NOW())
         RETURNING id"
    )
    .bind(&first_name)
    .bind(&last_name)
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await;

    match result {
        Ok(id) => {
            println!();
            println!("User created successfully!");
            println!("   ID: {}", id);
            println!("   Name: {} {}", first_name, last_name);
            println!("   Email: {}", email);
        }
        Err(e) => {
            eprintln!("Failed to create user: {}", e);
        }
    }

    pool.close().await;
    Ok(())
}

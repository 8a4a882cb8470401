// Mints a staff JWT for the admin and door-validator endpoints. Accounts are
// provisioned out of band; operators run this against the deployment's
// JWT_SECRET and hand the token to the staff member.
//
//   JWT_SECRET=... cargo run --bin issue_token -- door-1 door@fusionx.events validator

use fusionx_bookings::services::auth::{AuthService, ROLE_ADMIN, ROLE_VALIDATOR};

fn main() {
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: issue_token <staff-id> <email> <admin|validator>");
        std::process::exit(2);
    }

    let role = match args[3].as_str() {
        "admin" => ROLE_ADMIN,
        "validator" => ROLE_VALIDATOR,
        other => {
            eprintln!("Unknown role '{}': use admin or validator", other);
            std::process::exit(2);
        }
    };

    match AuthService::generate_token(&args[1], &args[2], role) {
        Ok(token) => println!("{}", token),
        Err(e) => {
            eprintln!("Failed to issue token: {}", e);
            std::process::exit(1);
        }
    }
}

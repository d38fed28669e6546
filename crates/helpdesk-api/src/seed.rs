use tracing::info;

use helpdesk_db::Database;
use helpdesk_types::models::Role;

use crate::auth::hash_password;

/// Stored in place of a hash for accounts that must never log in.
const LOCKED_PASSWORD: &str = "!";

/// Creates the default `system`, `admin` and `user` accounts when the users
/// table is empty. Returns whether anything was written.
pub fn seed_defaults(db: &Database, admin_password: &str, user_password: &str) -> anyhow::Result<bool> {
    if db.count_users()? > 0 {
        info!("Seed skipped, users already exist");
        return Ok(false);
    }

    db.create_user("system", "system@test.com", LOCKED_PASSWORD, Role::System)?;
    db.create_user("admin", "admin@test.com", &hash_password(admin_password)?, Role::Admin)?;
    db.create_user("user", "user@test.com", &hash_password(user_password)?, Role::User)?;

    info!("Seeded default accounts");
    Ok(true)
}

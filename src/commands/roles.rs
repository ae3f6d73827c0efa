//! Implementation of the `squad roles` command.

use crate::cli::RolesArgs;
use squad::config::ExecutionConfig;
use squad::error::{Result, SquadError};
use squad::roles::{RoleProvider, RoleRepository};

pub async fn cmd_roles(config: &ExecutionConfig, args: RolesArgs) -> Result<()> {
    let roles = RoleRepository::new(config.agents_directory.clone())
        .list_roles()
        .await?;

    if args.json {
        let json = serde_json::to_string_pretty(&serde_json::json!({ "roles": roles }))
            .map_err(|e| SquadError::UserError(format!("failed to encode roles: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    if roles.is_empty() {
        println!(
            "No roles found in {}. Add a markdown file per role.",
            config.agents_directory.display()
        );
        return Ok(());
    }

    let width = roles.iter().map(|r| r.id.len()).max().unwrap_or(0);
    for role in &roles {
        if role.description.is_empty() {
            println!("{:width$}  {}", role.id, role.name, width = width);
        } else {
            println!(
                "{:width$}  {} - {}",
                role.id,
                role.name,
                role.description,
                width = width
            );
        }
    }
    Ok(())
}

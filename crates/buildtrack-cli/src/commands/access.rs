use buildtrack_core::{has_permission, permissions_for, Actor, Permission, Role};
use colored::Colorize;

pub fn can(role: Role, permission: Permission) {
    let actor = Actor::new(0, role);
    if has_permission(Some(&actor), permission) {
        println!("{} {} may {}", "✓".green().bold(), role, permission);
    } else {
        println!("{} {} may not {}", "✗".red().bold(), role, permission);
    }
}

pub fn roles() {
    for role in Role::ALL {
        println!("{}", role.to_string().bold());
        for permission in permissions_for(role) {
            println!("  {}", permission);
        }
    }
}

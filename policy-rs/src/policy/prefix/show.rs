use anyhow::{Context, Error};
use std::fmt::Write;

use crate::policy::{Args, PolicyStore};

use super::PrefixList;

fn render(buf: &mut String, plist: &PrefixList) -> Result<(), Error> {
    writeln!(buf, "prefix-list {}", plist.name)?;
    for rule in plist.rules.values() {
        write!(buf, "  rule {} {} {}", rule.sequence, rule.action, rule.prefix)?;
        if let Some(ge) = rule.ge {
            write!(buf, " ge {}", ge)?;
        }
        if let Some(le) = rule.le {
            write!(buf, " le {}", le)?;
        }
        writeln!(buf)?;
        if let Some(desc) = &rule.description {
            writeln!(buf, "    description \"{}\"", desc)?;
        }
    }
    Ok(())
}

// Show all prefix-lists, or the one named in args.
pub fn prefix_list(store: &PolicyStore, mut args: Args, json: bool) -> Result<String, Error> {
    let plists: Vec<&PrefixList> = match args.string() {
        Some(name) => vec![
            store
                .prefix_list(&name)
                .context(format!("prefix-list '{}' not found", name))?,
        ],
        None => store.prefix_lists().collect(),
    };

    if json {
        return Ok(serde_json::to_string_pretty(&plists)?);
    }

    let mut buf = String::new();
    for plist in plists {
        render(&mut buf, plist)?;
    }
    Ok(buf)
}

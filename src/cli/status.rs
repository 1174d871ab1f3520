use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::importer::ImporterRegistry;
use crate::resolver::RefKind;
use crate::settings::load_settings;

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Mappings:   {}", settings.mappings_dir().display());
    println!("Database:   {}", db_path.display());
    let registry = ImporterRegistry::with_defaults();
    for kind in registry.kinds() {
        println!("Importer:   {} ({})", kind.key(), kind.name());
    }

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
        };
        println!();
        println!("Accounts:      {}", count("accounts")?);
        println!("Transactions:  {}", count("transactions")?);
        println!("Imports:       {}", count("imports")?);
        for kind in RefKind::ALL {
            let label = format!("{}:", capitalize(kind.table()));
            println!("{label:<15}{}", count(kind.table())?);
        }
    } else {
        println!();
        println!("Database not found. Run `finn init` to set up.");
    }

    Ok(())
}

use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        let expanded = shellexpand_path(&dir);
        std::fs::create_dir_all(&expanded)?;
        // canonical once it exists
        settings.data_dir = shellexpand_path(&expanded);
    }
    let data_path = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&data_path)?;
    std::fs::create_dir_all(settings.mappings_dir())?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;
    save_settings(&settings)?;

    println!("Initialized finn in {}", data_path.display());
    println!("Mappings:  {}", settings.mappings_dir().display());
    println!("Database:  {}", settings.db_path().display());
    Ok(())
}

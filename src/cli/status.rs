use crate::db::get_connection;
use crate::error::Result;
use crate::settings::load_settings;

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("User:       {}", or_unset(&settings.user_name));
    println!("Role:       {}", settings.role);
    println!("Company:    {}", or_unset(&settings.company_name));
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };

        println!();
        println!("Employees:        {}", count("SELECT count(*) FROM employees WHERE is_active = 1")?);
        println!(
            "Pending salaries: {}",
            count("SELECT count(*) FROM salaries WHERE processed_by IS NULL")?
        );
        println!(
            "Pending EPF:      {}",
            count("SELECT count(*) FROM epf_contributions WHERE status = 'pending'")?
        );
        println!(
            "Pending loans:    {}",
            count("SELECT count(*) FROM loan_requests WHERE status = 'pending'")?
        );
        println!(
            "Pending overtime: {}",
            count("SELECT count(*) FROM overtime WHERE status = 'pending'")?
        );
    } else {
        println!();
        println!("Database not found. Run `hrpay init` to set up.");
    }

    Ok(())
}

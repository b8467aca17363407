use comfy_table::{Cell, Table};

use crate::cli::{employee_names, name_of, open_db, parse_date_opt};
use crate::error::{PayrollError, Result};
use crate::fmt::money;
use crate::models::{Actor, Bonus, BonusType};
use crate::store;

pub fn add(
    actor: &Actor,
    employee: i64,
    amount: f64,
    bonus_type: &str,
    reason: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let conn = open_db()?;
    let bonus_type = BonusType::parse(bonus_type)
        .ok_or_else(|| PayrollError::Other(format!("Unknown bonus type: {bonus_type}")))?;
    let bonus = Bonus::new(employee, amount, bonus_type, reason, parse_date_opt(date.as_deref())?)?;
    let id = store::add_bonus(&conn, actor, &bonus)?;
    println!(
        "Added {} bonus #{id} of {} for employee #{employee}",
        bonus_type.as_str(),
        money(amount)
    );
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let names = employee_names(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Employee", "Date", "Type", "Amount", "Reason"]);
    for b in store::list_bonuses(&conn)? {
        table.add_row(vec![
            Cell::new(b.id.unwrap_or_default()),
            Cell::new(name_of(&names, b.employee_id)),
            Cell::new(b.date),
            Cell::new(b.bonus_type.as_str()),
            Cell::new(money(b.amount)),
            Cell::new(b.reason.unwrap_or_default()),
        ]);
    }
    println!("Bonuses\n{table}");
    Ok(())
}

pub fn delete(actor: &Actor, id: i64) -> Result<()> {
    let conn = open_db()?;
    store::delete_bonus(&conn, actor, id)?;
    println!("Deleted bonus #{id}");
    Ok(())
}

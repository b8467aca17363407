use clap::Parser;
use tracing_subscriber::EnvFilter;

use hrpay::cli::{
    self, BonusCommands, Cli, Commands, ContributionsCommands, EmployeesCommands, KpiCommands,
    LoansCommands, OvertimeCommands, SalaryCommands,
};
use hrpay::error::Result;
use hrpay::models::LoanStatus;
use hrpay::payroll::SalaryInput;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HRPAY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Cli) -> Result<()> {
    let actor = args.actor()?;

    match args.command {
        Commands::Init {
            data_dir,
            company,
            user,
        } => cli::init::run(data_dir, company, user),
        Commands::Status => cli::status::run(),
        Commands::Employees { command } => match command {
            EmployeesCommands::Add {
                name,
                department,
                position,
                salary,
                satisfaction,
            } => cli::employees::add(&actor, &name, &department, &position, salary, satisfaction),
            EmployeesCommands::List { all } => cli::employees::list(all),
            EmployeesCommands::Update {
                id,
                department,
                position,
                salary,
            } => cli::employees::update(&actor, id, department, position, salary),
            EmployeesCommands::Deactivate { id } => cli::employees::deactivate(&actor, id),
            EmployeesCommands::Import { file } => cli::employees::import(&actor, &file),
        },
        Commands::Salary { command } => match command {
            SalaryCommands::Calc {
                basic,
                ot_hours,
                ot_rate,
                bonus,
                increment,
                no_pay_days,
                cents,
            } => cli::salary::calc(
                SalaryInput {
                    basic_salary: basic,
                    ot_hours,
                    ot_rate,
                    bonus_amount: bonus,
                    increment_amount: increment,
                    no_pay_days,
                },
                cents,
            ),
            SalaryCommands::Record {
                employee,
                date,
                ot_hours,
                ot_rate,
                bonus,
                increment,
                no_pay_days,
            } => cli::salary::record(
                &actor,
                employee,
                date,
                SalaryInput {
                    basic_salary: 0.0,
                    ot_hours,
                    ot_rate,
                    bonus_amount: bonus,
                    increment_amount: increment,
                    no_pay_days,
                },
            ),
            SalaryCommands::Process { id } => cli::salary::process(&actor, id),
            SalaryCommands::List => cli::salary::list(),
        },
        Commands::Contributions { command } => match command {
            ContributionsCommands::Generate { month } => cli::contributions::generate(&actor, &month),
            ContributionsCommands::Process { month } => cli::contributions::process(&actor, &month),
            ContributionsCommands::List { month } => cli::contributions::list(&month),
        },
        Commands::Bonus { command } => match command {
            BonusCommands::Add {
                employee,
                amount,
                bonus_type,
                reason,
                date,
            } => cli::bonus::add(&actor, employee, amount, &bonus_type, reason, date),
            BonusCommands::List => cli::bonus::list(),
            BonusCommands::Delete { id } => cli::bonus::delete(&actor, id),
        },
        Commands::Overtime { command } => match command {
            OvertimeCommands::Add {
                employee,
                hours,
                rate,
                ot_type,
                date,
            } => cli::overtime::add(&actor, employee, hours, rate, &ot_type, date),
            OvertimeCommands::Approve { id } => cli::overtime::approve(&actor, id),
            OvertimeCommands::List => cli::overtime::list(),
        },
        Commands::Loans { command } => match command {
            LoansCommands::Types => cli::loans::types(),
            LoansCommands::Eligibility { employee } => cli::loans::eligibility(employee),
            LoansCommands::Request {
                employee,
                loan_type,
                amount,
                months,
                interest,
                date,
            } => cli::loans::request(&actor, employee, &loan_type, amount, months, interest, date),
            LoansCommands::Approve { id } => cli::loans::decide(&actor, id, LoanStatus::Approved),
            LoansCommands::Reject { id } => cli::loans::decide(&actor, id, LoanStatus::Rejected),
            LoansCommands::List => cli::loans::list(),
        },
        Commands::Kpi { command } => match command {
            KpiCommands::Record {
                employee,
                value,
                date,
            } => cli::kpi::record(&actor, employee, value, date),
            KpiCommands::List => cli::kpi::list(),
            KpiCommands::Rankings => cli::kpi::rankings(),
        },
        Commands::Report {
            kind,
            from_date,
            to_date,
            export,
            output,
            summary_sheet,
        } => cli::report::run(
            &kind,
            &from_date,
            &to_date,
            export.as_deref(),
            output,
            summary_sheet,
        ),
    }
}

fn main() {
    init_tracing();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

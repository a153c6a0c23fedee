use chrono::Local;
use debtplan::strategy::Strategy;
use debtplan::{
    compare_wealth, default_payoff_order, optimal_plan, suggest_autopilot, DebtSummary,
    Investment, Loan, PayoffComparison, PlanInput, WealthComparisonInput,
};
use log::info;
use simple_logger::SimpleLogger;

// sample household run through every simulator
fn main() -> Result<(), log::SetLoggerError> {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    let today = Local::now().date_naive();
    let loans = vec![
        Loan::new("house", 2_400_000., 5.2, 14_500.)
            .with_name("Mortgage")
            .with_term(300)
            .with_fee(50.)
            .with_fixed_rate(36, Some(4.6)),
        Loan::new("car", 180_000., 7.9, 4_200.)
            .with_name("Car loan")
            .with_term(48)
            .with_fee(75.),
        Loan::new("study", 320_000., 4.8, 2_900.)
            .with_name("Student loan")
            .with_term(150)
            .with_priority(9999),
        Loan::new("card", 25_000., 21.9, 1_500.)
            .with_name("Credit card")
            .with_term(20),
    ];
    let investments = vec![
        Investment::new("index", 150_000., 7.5),
        Investment::new("p2p", 40_000., 9.),
    ];

    let summary = DebtSummary::from_loans(&loans);
    info!(
        "debt {:.0}, monthly payments {:.0}, monthly interest {:.0}",
        summary.total_debt, summary.total_monthly_payment, summary.total_monthly_interest
    );

    info!("credit card schedule:");
    loans[3].show_amortization();

    let extra = 3_000.;
    let comparison = PayoffComparison::new(&loans, extra, today);
    for (label, result) in [
        ("snowball", &comparison.snowball),
        ("avalanche", &comparison.avalanche),
        ("minimum only", &comparison.minimum_only),
    ] {
        info!(
            "{}: debt free {} ({} months), interest {:.0}, saved {:.0}, order {:?}",
            label,
            result.debt_free_date,
            result.total_months,
            result.total_interest,
            comparison.interest_saved(result),
            result.payoff_order
        );
    }
    info!("cheapest ordering: {}", comparison.best());

    let custom = Strategy::Custom(vec!["car".to_string(), "card".to_string()]);
    let result = custom.run(&loans, extra, today);
    info!("custom: {} months, interest {:.0}", result.total_months, result.total_interest);

    let targets = vec!["car".to_string(), "card".to_string()];
    let wealth = compare_wealth(
        &loans,
        &WealthComparisonInput::new(targets, extra, 0.).with_investments(&investments),
    );
    info!(
        "over {} months paying down first changes wealth by {:.0}: {}",
        wealth.horizon_months, wealth.net_benefit, wealth.recommendation
    );

    let autopilot = suggest_autopilot(&loans, &investments);
    let input = PlanInput::new(extra, today)
        .with_payoff_order(default_payoff_order(&loans, &autopilot))
        .with_autopilot(autopilot);
    let plan = optimal_plan(&loans, &investments, &input);
    for milestone in &plan.summary.milestones {
        info!("{}", milestone);
    }
    info!(
        "after {} months: portfolio {:.0}, debt {:.0}, net wealth {:.0}",
        plan.months.len(),
        plan.summary.final_portfolio,
        plan.summary.final_debt,
        plan.summary.final_net_wealth
    );

    Ok(())
}

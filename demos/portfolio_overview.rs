use rust_decimal::Decimal;
use valuation_history::*;

fn main() -> Result<()> {
    println!("📈 Portfolio Overview Demo\n");
    println!("Three accounts report balances on irregular days. Each one is gap-filled,");
    println!("summed into its bucket, and the buckets are aligned on one daily axis.\n");

    let mut store = InMemorySnapshotStore::new();
    store.add_entity(EntityRecord::new(1, "checking", "Current account"));
    store.add_entity(EntityRecord::new(2, "savings", "Livret A"));
    store.add_entity(EntityRecord::new(3, "pea", "PEA"));
    store.add_entity(EntityRecord::new(4, "loan", "Mortgage"));

    store.upsert(RawSnapshot::new(1, "2024-01-01", Decimal::new(1_250_00, 2)));
    store.upsert(RawSnapshot::new(1, "2024-01-04", Decimal::new(980_40, 2)));
    store.upsert(RawSnapshot::new(2, "2024-01-03", Decimal::new(5_000_00, 2)));
    store.upsert(RawSnapshot::new(3, "2024-01-02", Decimal::new(12_400_00, 2)));
    store.upsert(RawSnapshot::new(3, "2024-01-06", Decimal::new(12_815_35, 2)));
    store.upsert(RawSnapshot::new(4, "2024-01-01", Decimal::new(-150_000_00, 2)));

    let service = ValuationHistoryService::new(store, EngineConfig::default());
    // Pass a YYYY-MM-DD argument to pin "today"; otherwise the local date is used.
    let ctx = match std::env::args().nth(1) {
        Some(arg) => RequestContext::new(parse_snapshot_date(0, &arg)?),
        None => RequestContext::for_local_today(),
    };
    let today = ctx.today;

    let report = service.portfolio_overview(&ctx, HistoryWindow::All)?;
    let Some(aligned) = report.data else {
        println!("No data.");
        return Ok(());
    };

    print!("{:<12}", "Date");
    for name in aligned.names() {
        print!("{:>18}", name);
    }
    println!("{:>14}", "Total");

    let totals = aligned.daily_totals();
    let skip = aligned.len().saturating_sub(10);
    if skip > 0 {
        println!("... {} earlier days omitted", skip);
    }
    for ((date, values), (_, total)) in aligned.to_rows().into_iter().zip(totals).skip(skip) {
        print!("{:<12}", format_snapshot_date(date));
        for value in values {
            print!("{:>18.2}", value);
        }
        println!("{:>14.2}", total);
    }

    println!("\n📊 Repartition on {}:", today);
    if let Some(shares) = aligned.repartition() {
        for (name, share) in shares {
            println!("  {:<18} {:>6.2} %", name, share);
        }
    }
    println!("  Total: {:.2}", aligned.grand_total());
    println!("\n(The mortgage has no bucket and is left out of every total.)");

    Ok(())
}

use trading_journal_engine::commands::{
    create_trade, export_all_data, get_dashboard_stats, get_equity_curve, get_settings,
    get_trades, import_all_data, update_settings, update_trade, DateRange,
};
use trading_journal_engine::models::UpdateSettingsInput;
use trading_journal_engine::{
    calculate_stats, Database, MarketCategory, ProfitFactor, TradeDirection, TradeDraft,
    TradeFilters, TradeStatus, TradeStore, TradeUpdate,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn draft(symbol: &str, date: i64, direction: TradeDirection, entry: f64, exit: Option<f64>, qty: f64) -> TradeDraft {
    TradeDraft {
        trade_date: date,
        market_category: MarketCategory::Forex,
        symbol: symbol.to_string(),
        direction,
        entry_price: entry,
        exit_price: exit,
        quantity: qty,
        status: if exit.is_some() { TradeStatus::Closed } else { TradeStatus::Open },
        pnl: None,
        notes: String::new(),
        screenshot_url: None,
        tags: vec![],
    }
}

#[test]
fn journal_lifecycle_on_disk() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trading_journal.db");
    let db = Database::new(path.to_str().unwrap()).unwrap();

    // 2023-05-10 .. 2023-05-13
    let day = 86_400;
    let base = 1_683_676_800 + 9 * 3600;

    create_trade(&db, draft("EUR/USD", base, TradeDirection::Long, 1.0750, Some(1.0820), 100_000.0)).unwrap();
    create_trade(&db, draft("GBP/USD", base + day, TradeDirection::Short, 1.2650, Some(1.2580), 100_000.0)).unwrap();
    create_trade(&db, draft("USD/JPY", base + 2 * day, TradeDirection::Long, 134.50, Some(133.75), 1_000.0)).unwrap();
    let open = create_trade(&db, draft("AUD/USD", base + 3 * day, TradeDirection::Long, 0.6700, None, 10_000.0)).unwrap();

    let stats = get_dashboard_stats(&db, DateRange::All).unwrap();
    assert_eq!(stats.total_trades, 3);
    assert_eq!(stats.open_trades, 1);
    assert_eq!(stats.winning_trades, 2);
    assert!((stats.total_profit - 1400.0).abs() < 1e-6);
    assert!((stats.total_loss - 750.0).abs() < 1e-6);
    assert!((stats.max_drawdown - 750.0).abs() < 1e-6);

    // Closing the open trade at a loss deepens the drawdown
    update_trade(
        &db,
        &open.id,
        TradeUpdate {
            status: Some(TradeStatus::Closed),
            exit_price: Some(0.6600),
            ..Default::default()
        },
    )
    .unwrap();

    let stats = get_dashboard_stats(&db, DateRange::All).unwrap();
    assert_eq!(stats.total_trades, 4);
    assert_eq!(stats.open_trades, 0);
    assert!((stats.max_drawdown - 850.0).abs() < 1e-6);
    assert!((stats.net_pnl - 550.0).abs() < 1e-6);
    assert!(matches!(stats.profit_factor, ProfitFactor::Ratio(_)));

    update_settings(&db, UpdateSettingsInput { initial_capital: Some(10_000.0), ..Default::default() }).unwrap();
    assert_eq!(get_settings(&db).unwrap().initial_capital, 10_000.0);
    let curve = get_equity_curve(&db, DateRange::All).unwrap();
    assert_eq!(curve.len(), 4);
    assert!((curve[3].balance - 10_550.0).abs() < 1e-6);

    // Backup survives a round trip through a second database
    let json = export_all_data(&db).unwrap();
    let restored = Database::open_in_memory().unwrap();
    import_all_data(&restored, &json).unwrap();
    assert_eq!(
        get_dashboard_stats(&restored, DateRange::All).unwrap(),
        get_dashboard_stats(&db, DateRange::All).unwrap()
    );
}

#[test]
fn stats_reads_are_independent_across_threads() {
    init_logging();
    let db = Database::open_in_memory().unwrap();
    for i in 0..20 {
        let exit = if i % 3 == 0 { 95.0 } else { 104.0 };
        create_trade(&db, draft("SPX", 1_000 + i, TradeDirection::Long, 100.0, Some(exit), 2.0)).unwrap();
    }

    let expected = get_dashboard_stats(&db, DateRange::All).unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| get_dashboard_stats(&db, DateRange::All).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn ledger_order_does_not_change_stats() {
    let db = Database::open_in_memory().unwrap();
    let pnls = [120.0, -40.0, -90.0, 60.0, -10.0, 200.0];
    for (i, pnl) in pnls.iter().enumerate() {
        let mut d = draft("ES", 10_000 - (i as i64) * 100, TradeDirection::Long, 100.0, Some(101.0), 1.0);
        d.pnl = Some(*pnl);
        create_trade(&db, d).unwrap();
    }

    let newest_first = get_trades(&db, None).unwrap();
    let mut oldest_first = db.list(&TradeFilters::default()).unwrap();
    oldest_first.reverse();

    let a = calculate_stats(&newest_first);
    let b = calculate_stats(&oldest_first);
    assert_eq!(a.max_drawdown, b.max_drawdown);
    assert_eq!(a.winning_trades, 3);
    // Chronological walk: 200, -10, 60, -90, -40, 120
    assert!((a.max_drawdown - 130.0).abs() < 1e-9);
}

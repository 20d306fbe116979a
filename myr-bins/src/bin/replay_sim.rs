//! Synthetic market replay against the full core
//!
//! A producer thread random-walks a mid price and builds full-depth
//! book snapshots; the driver publishes each snapshot, opens positions
//! passively, escalates stalled opens, runs the protective stops, and
//! fills orders against the published book. Exercises every intention
//! transition end to end without a broker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::{self, Receiver};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use myr_bins::common::{init_logging, CommonArgs};
use myr_core::prelude::*;
use myr_core::testing::SimGateway;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Number of synthetic book snapshots to replay
    #[arg(short, long, default_value = "10000")]
    ticks: u64,

    /// Planned position size in lots
    #[arg(short, long, default_value = "1.0")]
    qty: f64,

    /// Stop-loss: maximum loss per lot
    #[arg(long, default_value = "2.0")]
    max_loss: f64,

    /// Trailing stop: profit per lot to arm
    #[arg(long, default_value = "3.0")]
    trailing_activate: f64,

    /// Trailing stop: profit per lot to close at
    #[arg(long, default_value = "1.0")]
    trailing_close: f64,

    /// Take-profit: profit per lot to arm
    #[arg(long, default_value = "4.0")]
    take_profit_activate: f64,

    /// Take-profit: share of the peak given back
    #[arg(long, default_value = "0.25")]
    take_profit_share: f64,

    /// Snapshots a passive open may rest before escalating
    #[arg(long, default_value = "200")]
    passive_timeout_ticks: u64,

    /// Random walk seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

#[derive(Debug, Default)]
struct ReplayStats {
    ticks: u64,
    positions_opened: u64,
    positions_completed: u64,
    escalated_opens: u64,
    stop_loss_hits: u64,
    trailing_stop_hits: u64,
    take_profit_hits: u64,
    realized_pnl: Amount,
}

/// One position plus its attached stop algorithms
struct Trade {
    position: Position,
    stop_loss: StopLoss,
    trailing: TrailingStop,
    take_profit: TakeProfit,
    sent_tick: u64,
    escalated: bool,
}

struct ReplayDriver {
    gateway: SimGateway,
    cell: Arc<BookCell>,
    trade: Option<Trade>,
    outstanding: Option<OrderId>,
    seen_sends: usize,
    seen_cancels: usize,
    stats: ReplayStats,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.common);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("failed to install shutdown handler")?;
    }

    tracing::info!(
        security_id = args.common.security_id,
        ticks = args.ticks,
        qty = args.qty,
        "starting synthetic replay"
    );

    let stop_loss_params = StopLossParams::new(fixed_point::from_f64(args.max_loss))
        .context("invalid stop-loss settings")?;
    let trailing_params = TrailingStopParams::new(
        fixed_point::from_f64(args.trailing_activate),
        fixed_point::from_f64(args.trailing_close),
    )
    .context("invalid trailing stop settings")?;
    let take_profit_params = TakeProfitParams::new(
        fixed_point::from_f64(args.take_profit_activate),
        fixed_point::from_f64(args.take_profit_share),
    )
    .context("invalid take-profit settings")?;

    let registry = BookRegistry::new();
    let security = SecurityId(args.common.security_id);
    let cell = registry.cell(security);
    let qty = fixed_point::from_f64(args.qty);
    anyhow::ensure!(qty > 0, "position quantity must be positive");

    let feed = spawn_feed(args.ticks, args.seed, shutdown.clone());
    let mut driver = ReplayDriver {
        gateway: SimGateway::new(),
        cell: cell.clone(),
        trade: None,
        outstanding: None,
        seen_sends: 0,
        seen_cancels: 0,
        stats: ReplayStats::default(),
    };

    for book in feed.iter() {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let tick = book.time();
        cell.publish(book);
        driver.stats.ticks += 1;

        if driver.trade.is_none() {
            let position = Position::new(security, PositionSide::Long, qty, cell.clone(), tick);
            driver.trade = Some(Trade {
                position,
                stop_loss: StopLoss::new(stop_loss_params),
                trailing: TrailingStop::new(trailing_params),
                take_profit: TakeProfit::new(take_profit_params),
                sent_tick: tick,
                escalated: false,
            });
            driver.stats.positions_opened += 1;
        }

        driver
            .step(tick, args.passive_timeout_ticks)
            .with_context(|| format!("replay failed at tick {tick}"))?;
    }

    print_stats(&driver.stats);
    Ok(())
}

impl ReplayDriver {
    /// Advance the live trade by one snapshot.
    fn step(&mut self, tick: u64, passive_timeout: u64) -> Result<()> {
        let Some(trade) = self.trade.as_mut() else {
            return Ok(());
        };

        trade.position.sync(&mut self.gateway)?;
        self.track_traffic();
        self.ack_cancels()?;
        self.try_fill()?;

        let Some(trade) = self.trade.as_mut() else {
            return Ok(());
        };

        // Escalate a stalled passive open.
        if trade.position.intention() == Intention::OpenPassive
            && !trade.escalated
            && tick.saturating_sub(trade.sent_tick) > passive_timeout
        {
            trade
                .position
                .set_intention(Intention::OpenAggressive, &mut self.gateway)?;
            trade.escalated = true;
            self.stats.escalated_opens += 1;
            self.track_traffic();
            self.ack_cancels()?;
            self.try_fill()?;
        }

        let Some(trade) = self.trade.as_mut() else {
            return Ok(());
        };

        if trade.position.is_opened() && !trade.position.is_completed() {
            trade
                .stop_loss
                .run(&mut trade.position, &mut self.gateway)?;
            trade.trailing.run(&mut trade.position, &mut self.gateway)?;
            trade
                .take_profit
                .run(&mut trade.position, &mut self.gateway)?;
            self.track_traffic();
            self.ack_cancels()?;
            self.try_fill()?;
        }

        self.finish_completed();
        Ok(())
    }

    /// Pick up orders the position machine just sent.
    fn track_traffic(&mut self) {
        if self.gateway.sent_count() > self.seen_sends {
            self.seen_sends = self.gateway.sent_count();
            self.outstanding = self.gateway.last_order_id();
        }
    }

    /// Confirm every cancel the machine requested.
    fn ack_cancels(&mut self) -> Result<()> {
        while self.seen_cancels < self.gateway.cancel_count() {
            self.seen_cancels += 1;
            let (Some(trade), Some(order_id)) = (self.trade.as_mut(), self.outstanding) else {
                continue;
            };
            let ack = self.gateway.cancelled_ack(order_id);
            self.outstanding = None;
            trade.position.on_order_status(ack, &mut self.gateway)?;
            self.track_traffic();
        }
        Ok(())
    }

    /// Fill the outstanding order when the published book reaches it.
    fn try_fill(&mut self) -> Result<()> {
        let (Some(trade), Some(order_id)) = (self.trade.as_mut(), self.outstanding) else {
            return Ok(());
        };
        let Some(request) = self.gateway.request_for(order_id) else {
            return Ok(());
        };

        let fill_price = match request.side {
            Side::Buy => self.cell.best_ask().map(|l| l.price()),
            Side::Sell => self.cell.best_bid().map(|l| l.price()),
        };
        let Some(top) = fill_price else {
            return Ok(());
        };

        let crossed = match (request.price, request.side) {
            // Marketable: trades at the far touch immediately.
            (None, _) => Some(top),
            (Some(limit), Side::Buy) if top <= limit => Some(top.min(limit)),
            (Some(limit), Side::Sell) if top >= limit => Some(top.max(limit)),
            _ => None,
        };

        if let Some(price) = crossed {
            let fill = self.gateway.filled(order_id, price);
            self.outstanding = None;
            trade.position.on_order_status(fill, &mut self.gateway)?;
            self.track_traffic();
        }
        Ok(())
    }

    /// Account and retire a completed round trip.
    fn finish_completed(&mut self) {
        let Some(trade) = self.trade.as_ref() else {
            return;
        };
        if !trade.position.is_completed() {
            return;
        }

        let pnl = trade.position.realized_pnl();
        self.stats.realized_pnl += pnl;
        self.stats.positions_completed += 1;
        match trade.position.close_reason() {
            CloseReason::StopLoss => self.stats.stop_loss_hits += 1,
            CloseReason::TrailingStop => self.stats.trailing_stop_hits += 1,
            CloseReason::TakeProfit => self.stats.take_profit_hits += 1,
            CloseReason::None | CloseReason::Signal => {}
        }
        tracing::debug!(
            security = %trade.position.security(),
            pnl = fixed_point::to_f64(pnl),
            reason = %trade.position.close_reason(),
            "round trip completed"
        );
        self.trade = None;
        self.outstanding = None;
    }
}

/// Random-walk book producer.
fn spawn_feed(ticks: u64, seed: u64, shutdown: Arc<AtomicBool>) -> Receiver<PriceBook> {
    let (tx, rx) = channel::bounded(1024);
    thread::spawn(move || {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut mid = 100.0f64;
        for seq in 1..=ticks {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            mid = (mid + rng.gen_range(-0.05..=0.05)).clamp(50.0, 200.0);
            if tx.send(build_book(seq, mid, &mut rng)).is_err() {
                break;
            }
        }
    });
    rx
}

fn build_book(time: u64, mid: f64, rng: &mut StdRng) -> PriceBook {
    const TICK: f64 = 0.1;
    let mut book = PriceBook::with_time(time);
    let best_bid = mid - TICK / 2.0;
    let best_ask = mid + TICK / 2.0;
    for i in 0..SIDE_MAX_SIZE {
        let depth = i as f64 * TICK;
        let qty = fixed_point::from_f64(rng.gen_range(0.5..=5.0));
        // Prices are one tick apart; a collision means the generator
        // is broken, so surface it instead of silently dropping.
        if let Err(err) = book
            .bid_mut()
            .add(time, fixed_point::from_f64(best_bid - depth), qty)
        {
            tracing::warn!(%err, time, "bid level rejected");
        }
        if let Err(err) = book
            .ask_mut()
            .add(time, fixed_point::from_f64(best_ask + depth), qty)
        {
            tracing::warn!(%err, time, "ask level rejected");
        }
    }
    book
}

fn print_stats(stats: &ReplayStats) {
    tracing::info!("=== Replay Statistics ===");
    tracing::info!("Snapshots processed: {}", stats.ticks);
    tracing::info!(
        "Positions: {} opened, {} completed, {} escalated opens",
        stats.positions_opened,
        stats.positions_completed,
        stats.escalated_opens
    );
    tracing::info!(
        "Stop hits: {} stop-loss, {} trailing, {} take-profit",
        stats.stop_loss_hits,
        stats.trailing_stop_hits,
        stats.take_profit_hits
    );
    tracing::info!(
        "Realized PnL: {:.4}",
        fixed_point::to_f64(stats.realized_pnl)
    );
}

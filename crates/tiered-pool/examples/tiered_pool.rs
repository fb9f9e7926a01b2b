//! Resource pool example.
//!
//! This example pools simulated network clients that are slow to build,
//! drives a burst of concurrent load through the pool, and shows the
//! recycler shrinking the overflow tier once the burst is over.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=debug cargo run --example tiered_pool
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tiered_pool::{Pool, PoolConfig, PoolError};
use tokio::time::Instant;

/// Stand-in for an expensive client, e.g. a TLS connection.
#[derive(Debug)]
struct Client {
    id: u64,
    requests: u64,
}

impl Client {
    async fn call(&mut self, payload: u32) -> io::Result<u32> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.requests += 1;
        if payload % 13 == 0 {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset"));
        }
        Ok(payload * 2)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Tiered Resource Pool Example ===\n");

    let pool_config = PoolConfig::new()
        .min_idle(2)
        .max_idle(6)
        .recycle_interval(Duration::from_millis(500));

    println!("Pool configuration:");
    println!("  Min idle: {}", pool_config.min_idle);
    println!("  Max idle: {}", pool_config.max_idle);
    println!("  Recycle interval: {:?}", pool_config.recycle_interval);
    println!();

    let next_id = Arc::new(AtomicU64::new(1));
    let pool: Pool<Client, io::Error> = Pool::builder()
        .config(pool_config)
        .factory(move || {
            let id = next_id.fetch_add(1, Ordering::Relaxed);
            async move {
                // Connection setup cost
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(Client { id, requests: 0 })
            }
        })
        .destructor(|client: Client| {
            println!(
                "  closing client {} after {} requests",
                client.id, client.requests
            );
        })
        .build();

    // Example 1: Basic usage
    println!("1. Acquire and release:");
    {
        let mut client = pool.acquire().await?;
        let result = client.call(21).await;
        println!("  client {} answered {:?}", client.id, result);
        let fault = result.as_ref().err().map(|e| e as &dyn std::error::Error);
        let outcome = pool.release(Some(client), fault)?;
        println!("  released to {:?}", outcome);
    }
    print_pool_status(&pool);

    // Example 2: Guard usage
    println!("\n2. Guard usage:");
    {
        let mut client = pool.get().await?;
        if let Err(e) = client.call(26).await {
            println!("  call failed ({e}); marking client {} faulted", client.id);
            client.mark_faulted();
        }
        // Released (or destroyed) on drop
    }
    print_pool_status(&pool);

    // Example 3: Burst of concurrent load
    println!("\n3. Burst of 20 concurrent requests:");
    let start = Instant::now();
    let mut handles = vec![];
    for i in 0..20 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let mut client = pool.get().await?;
            if client.call(i).await.is_err() {
                client.mark_faulted();
            }
            Ok::<_, PoolError<io::Error>>(())
        }));
    }
    for handle in handles {
        handle.await??;
    }
    println!("  Completed in {:?}", start.elapsed());
    print_pool_status(&pool);
    print_pool_metrics(&pool);

    // Example 4: Recycler compaction
    println!("\n4. Idle period (recycler compacts the overflow tier):");
    tokio::time::sleep(Duration::from_millis(600)).await;
    print_pool_status(&pool);

    // Graceful shutdown
    println!("\n5. Graceful shutdown:");
    pool.close().await;
    print_pool_status(&pool);
    print_pool_metrics(&pool);

    Ok(())
}

fn print_pool_status(pool: &Pool<Client, io::Error>) {
    let status = pool.status();
    println!(
        "  Status: primary {}/{} overflow {}/{}{}",
        status.primary_idle,
        status.min_idle,
        status.overflow_idle,
        status.max_idle - status.min_idle,
        if status.closed { " (closed)" } else { "" }
    );
}

fn print_pool_metrics(pool: &Pool<Client, io::Error>) {
    let metrics = pool.metrics();
    println!("  Metrics:");
    println!("    Clients created: {}", metrics.created);
    println!("    Clients destroyed: {}", metrics.destroyed);
    println!("    Reuse ratio: {:.2}%", metrics.reuse_ratio() * 100.0);
    println!("    Recycled into primary: {}", metrics.recycled);
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinSet;

use crate::invariants::assert_all_campaign_invariants;
use crate::{
    AccountId, Amount, CampaignId, CampaignRegistry, CampaignStatus, InMemoryTreasury,
    LedgerError, ManualClock, MemorySink, Timestamp, TransferError, Treasury, SECONDS_PER_DAY,
};

/// Treasury whose transfers wait for a release signal before settling.
#[derive(Clone, Default)]
struct GatedTreasury {
    gate: Arc<Notify>,
    inner: InMemoryTreasury,
}

#[async_trait]
impl Treasury for GatedTreasury {
    async fn transfer(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        self.gate.notified().await;
        self.inner.transfer(to, amount).await
    }
}

fn registry_with(treasury: impl Treasury + 'static) -> (Arc<CampaignRegistry>, ManualClock, MemorySink) {
    let clock = ManualClock::new(Timestamp(10_000));
    let sink = MemorySink::new();
    let registry = CampaignRegistry::new(treasury, clock.clone(), sink.clone());
    (Arc::new(registry), clock, sink)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_contributions_are_all_accounted() {
    let (registry, _clock, sink) = registry_with(InMemoryTreasury::new());
    let creator = AccountId::from("creator");
    let id = registry
        .create_campaign(&creator, "t", "d", Amount(1_000_000), 1)
        .await
        .unwrap();

    let mut tasks = JoinSet::new();
    for i in 0..64u128 {
        let registry = registry.clone();
        tasks.spawn(async move {
            let donor = AccountId::new(format!("donor-{}", i % 8));
            registry.contribute(id, &donor, Amount(i + 1)).await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    let campaign = registry.get_campaign(id).await.unwrap();
    assert_eq!(campaign.total_pooled, Amount((1..=64).sum()));
    assert_eq!(campaign.contributions.len(), 8);
    assert_all_campaign_invariants(&campaign);

    let sequences: Vec<u64> = sink.for_campaign(id).iter().map(|n| n.sequence).collect();
    assert_eq!(sequences, (0..=64).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_goal_latch_flips_once_under_contention() {
    let (registry, _clock, _sink) = registry_with(InMemoryTreasury::new());
    let creator = AccountId::from("creator");
    let id = registry
        .create_campaign(&creator, "t", "d", Amount(100), 1)
        .await
        .unwrap();

    let mut tasks = JoinSet::new();
    for i in 0..40 {
        let registry = registry.clone();
        tasks.spawn(async move {
            let donor = AccountId::new(format!("donor-{i}"));
            registry.contribute(id, &donor, Amount(10)).await
        });
    }
    let mut accepted = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(()) => accepted += 1,
            Err(LedgerError::CampaignCompleted) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // Exactly the contributions up to the goal land; the rest see the latch.
    assert_eq!(accepted, 10);
    let campaign = registry.get_campaign(id).await.unwrap();
    assert_eq!(campaign.status, CampaignStatus::GoalReached);
    assert_eq!(campaign.total_pooled, Amount(100));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_pay_out_exactly_once() {
    let treasury = InMemoryTreasury::new();
    let (registry, _clock, _sink) = registry_with(treasury.clone());
    let creator = AccountId::from("creator");
    let id = registry
        .create_campaign(&creator, "t", "d", Amount(50), 1)
        .await
        .unwrap();
    registry
        .contribute(id, &AccountId::from("donor"), Amount(75))
        .await
        .unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let registry = registry.clone();
        let creator = creator.clone();
        tasks.spawn(async move { registry.claim_funds(id, &creator).await });
    }
    let mut paid = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(amount) => paid.push(amount),
            Err(LedgerError::AlreadyClaimed) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(paid, vec![Amount(75)]);
    assert_eq!(treasury.transfers(), vec![(creator, Amount(75))]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refunds_pay_each_balance_once() {
    let treasury = InMemoryTreasury::new();
    let (registry, clock, _sink) = registry_with(treasury.clone());
    let creator = AccountId::from("creator");
    let donor = AccountId::from("donor");
    let id = registry
        .create_campaign(&creator, "t", "d", Amount(1_000), 1)
        .await
        .unwrap();
    registry.contribute(id, &donor, Amount(40)).await.unwrap();
    clock.advance(SECONDS_PER_DAY);

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let registry = registry.clone();
        let donor = donor.clone();
        tasks.spawn(async move { registry.get_refund(id, &donor).await });
    }
    let mut refunded = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(amount) => refunded.push(amount),
            Err(LedgerError::NoContribution) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(refunded, vec![Amount(40)]);
    assert_eq!(treasury.balance_of(&donor), Amount(40));
    assert_eq!(
        registry.get_campaign(id).await.unwrap().total_pooled,
        Amount::ZERO
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pending_transfer_blocks_only_its_own_campaign() {
    let treasury = GatedTreasury::default();
    let gate = treasury.gate.clone();
    let (registry, _clock, _sink) = registry_with(treasury);
    let creator = AccountId::from("creator");
    let donor = AccountId::from("donor");

    let busy = registry
        .create_campaign(&creator, "busy", "d", Amount(10), 1)
        .await
        .unwrap();
    let idle = registry
        .create_campaign(&creator, "idle", "d", Amount(1_000), 1)
        .await
        .unwrap();
    registry.contribute(busy, &donor, Amount(10)).await.unwrap();

    let claim = {
        let registry = registry.clone();
        let creator = creator.clone();
        tokio::spawn(async move { registry.claim_funds(busy, &creator).await })
    };
    // Let the claim take the campaign lock and park in the transfer.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Other campaigns and the registry itself stay available.
    tokio::time::timeout(Duration::from_secs(1), registry.contribute(idle, &donor, Amount(5)))
        .await
        .expect("independent campaign must not wait")
        .unwrap();
    let _ = tokio::time::timeout(
        Duration::from_secs(1),
        registry.create_campaign(&creator, "new", "d", Amount(1), 1),
    )
    .await
    .expect("creation must not wait");

    // The claimed campaign is serialized behind the pending transfer.
    let blocked = tokio::time::timeout(
        Duration::from_millis(100),
        registry.get_campaign_stats(busy, &donor),
    )
    .await;
    assert!(blocked.is_err());
    assert_eq!(
        registry.campaign_count().await,
        3,
        "registry lock must not be held across transfers"
    );

    gate.notify_one();
    assert_eq!(claim.await.unwrap().unwrap(), Amount(10));
    assert_eq!(
        registry.get_campaign(busy).await.unwrap().status,
        CampaignStatus::Claimed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_allocates_unique_ids() {
    let (registry, _clock, sink) = registry_with(InMemoryTreasury::new());

    let mut tasks = JoinSet::new();
    for i in 0..32 {
        let registry = registry.clone();
        tasks.spawn(async move {
            let creator = AccountId::new(format!("creator-{i}"));
            registry
                .create_campaign(&creator, "t", "d", Amount(1), 1)
                .await
        });
    }
    let mut ids = Vec::new();
    while let Some(result) = tasks.join_next().await {
        ids.push(result.unwrap().unwrap());
    }
    ids.sort();

    assert_eq!(ids, (0..32).map(CampaignId).collect::<Vec<_>>());
    assert_eq!(registry.campaign_count().await, 32);
    assert_eq!(sink.len(), 32);
}

use crate::{
    AccountId, Amount, CampaignEvent, CampaignId, CampaignRegistry, InMemoryTreasury, ManualClock,
    MemorySink, Timestamp, SECONDS_PER_DAY,
};

const START: Timestamp = Timestamp(1_000_000);

fn setup() -> (CampaignRegistry, ManualClock, MemorySink, InMemoryTreasury) {
    let clock = ManualClock::new(START);
    let sink = MemorySink::new();
    let treasury = InMemoryTreasury::new();
    let registry = CampaignRegistry::new(treasury.clone(), clock.clone(), sink.clone());
    (registry, clock, sink, treasury)
}

#[tokio::test]
async fn test_campaign_created_event() {
    let (registry, _clock, sink, _treasury) = setup();
    let creator = AccountId::from("creator");
    let id = registry
        .create_campaign(&creator, "Library", "Books for all", Amount(5_000), 2)
        .await
        .unwrap();

    let last = sink.last().expect("No events found");
    assert_eq!(last.sequence, 0);
    assert_eq!(last.emitted_at, START);
    assert_eq!(
        last.event,
        CampaignEvent::CampaignCreated {
            id,
            creator,
            title: "Library".to_string(),
            goal: Amount(5_000),
            deadline: Timestamp(START.0 + 2 * SECONDS_PER_DAY),
        }
    );
}

#[tokio::test]
async fn test_contribution_made_event() {
    let (registry, clock, sink, _treasury) = setup();
    let creator = AccountId::from("creator");
    let donor = AccountId::from("donor");
    let id = registry
        .create_campaign(&creator, "t", "d", Amount(10_000), 1)
        .await
        .unwrap();

    clock.advance(60);
    registry.contribute(id, &donor, Amount(1_000)).await.unwrap();

    let last = sink.last().expect("No events found");
    assert_eq!(last.sequence, 1);
    assert_eq!(last.emitted_at, Timestamp(START.0 + 60));
    assert_eq!(
        last.event,
        CampaignEvent::ContributionMade {
            id,
            contributor: donor,
            amount: Amount(1_000),
        }
    );
}

#[tokio::test]
async fn test_funds_claimed_event() {
    let (registry, _clock, sink, _treasury) = setup();
    let creator = AccountId::from("creator");
    let id = registry
        .create_campaign(&creator, "t", "d", Amount(100), 1)
        .await
        .unwrap();
    registry
        .contribute(id, &AccountId::from("a"), Amount(70))
        .await
        .unwrap();
    registry
        .contribute(id, &AccountId::from("b"), Amount(40))
        .await
        .unwrap();
    registry.claim_funds(id, &creator).await.unwrap();

    let last = sink.last().expect("No events found");
    assert_eq!(last.sequence, 3);
    assert_eq!(
        last.event,
        CampaignEvent::FundsClaimed {
            id,
            creator,
            amount: Amount(110),
        }
    );
}

#[tokio::test]
async fn test_refund_issued_event() {
    let (registry, clock, sink, _treasury) = setup();
    let creator = AccountId::from("creator");
    let donor = AccountId::from("donor");
    let id = registry
        .create_campaign(&creator, "t", "d", Amount(100), 1)
        .await
        .unwrap();
    registry.contribute(id, &donor, Amount(40)).await.unwrap();
    clock.advance(SECONDS_PER_DAY);
    registry.get_refund(id, &donor).await.unwrap();

    let last = sink.last().expect("No events found");
    assert_eq!(last.emitted_at, Timestamp(START.0 + SECONDS_PER_DAY));
    assert_eq!(
        last.event,
        CampaignEvent::RefundIssued {
            id,
            contributor: donor,
            amount: Amount(40),
        }
    );
}

#[tokio::test]
async fn test_campaign_updated_event() {
    let (registry, _clock, sink, _treasury) = setup();
    let creator = AccountId::from("creator");
    let id = registry
        .create_campaign(&creator, "t", "d", Amount(100), 1)
        .await
        .unwrap();
    registry
        .update_campaign_details(id, &creator, "New title", "New description")
        .await
        .unwrap();

    let last = sink.last().expect("No events found");
    assert_eq!(
        last.event,
        CampaignEvent::CampaignUpdated {
            id,
            new_title: "New title".to_string(),
            new_description: "New description".to_string(),
        }
    );
}

#[tokio::test]
async fn test_rejected_operations_emit_nothing() {
    let (registry, clock, sink, treasury) = setup();
    let creator = AccountId::from("creator");
    let donor = AccountId::from("donor");

    let _ = registry
        .create_campaign(&creator, "t", "d", Amount::ZERO, 1)
        .await;
    assert!(sink.is_empty());

    let id = registry
        .create_campaign(&creator, "t", "d", Amount(100), 1)
        .await
        .unwrap();
    registry.contribute(id, &donor, Amount(10)).await.unwrap();
    let baseline = sink.len();

    let _ = registry.contribute(id, &donor, Amount::ZERO).await;
    let _ = registry.claim_funds(id, &creator).await;
    let _ = registry.get_refund(id, &donor).await;
    let _ = registry
        .update_campaign_details(id, &donor, "x", "y")
        .await;
    clock.advance(SECONDS_PER_DAY);
    treasury.reject(&donor);
    let _ = registry.get_refund(id, &donor).await;
    assert_eq!(sink.len(), baseline);

    // A rejection does not consume a sequence number.
    treasury.accept(&donor);
    registry.get_refund(id, &donor).await.unwrap();
    assert_eq!(sink.last().unwrap().sequence, 2);
}

#[tokio::test]
async fn test_sequences_are_per_campaign_and_gapless() {
    let (registry, _clock, sink, _treasury) = setup();
    let creator = AccountId::from("creator");
    let donor = AccountId::from("donor");
    let first = registry
        .create_campaign(&creator, "a", "a", Amount(1_000), 1)
        .await
        .unwrap();
    let second = registry
        .create_campaign(&creator, "b", "b", Amount(1_000), 1)
        .await
        .unwrap();
    for round in 1..=4u128 {
        registry.contribute(first, &donor, Amount(round)).await.unwrap();
        if round % 2 == 0 {
            registry
                .contribute(second, &donor, Amount(round))
                .await
                .unwrap();
        }
    }

    for (id, expected) in [(first, 5u64), (second, 3u64)] {
        let sequences: Vec<u64> = sink.for_campaign(id).iter().map(|n| n.sequence).collect();
        assert_eq!(sequences, (0..expected).collect::<Vec<_>>());
    }
    assert_eq!(sink.for_campaign(CampaignId(99)).len(), 0);
}

#[test]
fn test_event_accessors() {
    let event = CampaignEvent::RefundIssued {
        id: CampaignId(4),
        contributor: AccountId::from("donor"),
        amount: Amount(9),
    };
    assert_eq!(event.campaign_id(), CampaignId(4));
    assert_eq!(event.name(), "refund_issued");
    assert_eq!(event.actor(), Some(&AccountId::from("donor")));
    assert_eq!(event.amount(), Some(Amount(9)));

    let updated = CampaignEvent::CampaignUpdated {
        id: CampaignId(4),
        new_title: "t".into(),
        new_description: "d".into(),
    };
    assert_eq!(updated.actor(), None);
    assert_eq!(updated.amount(), None);
}

#[test]
fn test_event_json_shape() {
    let event = CampaignEvent::ContributionMade {
        id: CampaignId(1),
        contributor: AccountId::from("donor"),
        amount: Amount(25),
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "type": "contribution_made",
            "id": 1,
            "contributor": "donor",
            "amount": 25,
        })
    );
}

use bitgrid::summary::{parse_summary_response, SUMMARY_PATH};
use bitgrid::{LocalSummaryService, SummaryFetcher, SummaryRequest, SummaryTransport};
use futures::executor::block_on;
use num_bigint::BigUint;
use serde_json::Value;

#[test]
fn errors_come_back_as_400_with_a_code() {
    let svc = LocalSummaryService::default();
    for (body, code) in [
        ("{", "invalid_json"),
        (r#"{"value":"ten"}"#, "invalid_value"),
        (r#"{"value":"1","mode":"binary"}"#, "mode_not_supported"),
    ] {
        let resp = svc.respond(body);
        assert_eq!(resp.status, 400, "{body}");
        let v: Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(v["error"], code);
    }
}

#[test]
fn small_cap_rejects_instead_of_allocating() {
    let svc = LocalSummaryService { cap: 4 };
    let resp = svc.respond(r#"{"value":"40961"}"#);
    assert_eq!(resp.status, 400);
    assert!(resp.body.contains("too_large"));
}

#[test]
fn service_answer_round_trips_through_the_client_check() {
    let svc = LocalSummaryService::default();
    let total = BigUint::from(8192u32 * 7 + 4096);
    let resp = svc.respond(&SummaryRequest::for_total_bits(&total).to_json().unwrap());
    assert_eq!(resp.status, 200);
    let kb = parse_summary_response(resp.status, &resp.body, &total).unwrap();
    assert_eq!(kb, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.5]);
}

#[test]
fn unknown_path_is_not_found() {
    let svc = LocalSummaryService::default();
    let resp = block_on(svc.post_json("/api/other", "{}".to_string())).unwrap();
    assert_eq!(resp.status, 404);
    let resp = block_on(svc.post_json(SUMMARY_PATH, "{}".to_string())).unwrap();
    assert_eq!(resp.status, 200);
}

#[test]
fn fetcher_only_wants_capped_tier_plans() {
    let fetcher = SummaryFetcher::new(LocalSummaryService::default());
    assert!(!fetcher.wants(&bitgrid::select_level(&BigUint::from(16_384u32))));
    assert!(fetcher.wants(&bitgrid::select_level(&BigUint::from(41_943_040u32))));
    let big = bitgrid::Level::Gb.bits_per_block() * 64u32;
    assert!(!fetcher.wants(&bitgrid::select_level(&big)));
    assert!(SummaryFetcher::new(LocalSummaryService::default()).with_cap(1 << 30).wants(&bitgrid::select_level(&big)));
}

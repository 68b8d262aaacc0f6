use common::{
    subnet::{plan_subnets, AddressBlock},
    Error,
};

fn cidrs(blocks: &[AddressBlock]) -> Vec<String> {
    blocks.iter().map(|b| b.to_string()).collect()
}

#[test]
fn first_block_is_the_highest_aligned_one() {
    let planned = plan_subnets::<&str>("10.0.0.0/16", &[], 26, 2).unwrap();
    assert_eq!(cidrs(&planned), vec!["10.0.255.192/26", "10.0.255.128/26"]);
}

#[test]
fn planned_blocks_never_overlap_each_other_or_existing_ones() {
    let cases: Vec<(&str, Vec<&str>, u8, usize)> = vec![
        ("10.0.0.0/16", vec!["10.0.0.0/24", "10.0.255.0/25"], 26, 8),
        ("172.16.0.0/12", vec!["172.31.255.192/26", "172.31.255.0/27"], 26, 5),
        ("192.168.10.0/24", vec!["192.168.10.64/26"], 28, 16),
        ("10.10.0.0/20", vec![], 22, 10),
    ];
    for (parent, existing, prefix, count) in cases {
        let planned = plan_subnets(parent, existing.as_slice(), prefix, count).unwrap();
        assert!(!planned.is_empty(), "nothing planned for {parent}");
        assert!(planned.len() <= count);

        let existing: Vec<AddressBlock> = existing.iter().map(|e| e.parse().unwrap()).collect();
        for (i, a) in planned.iter().enumerate() {
            assert_eq!(a.prefix_len(), prefix);
            assert!(
                !existing.iter().any(|e| e.overlaps(a)),
                "{a} overlaps an existing subnet of {parent}"
            );
            for b in &planned[i + 1..] {
                assert!(!a.overlaps(b), "{a} overlaps {b}");
            }
        }
    }
}

#[test]
fn blocks_come_out_in_descending_order() {
    let planned = plan_subnets("10.0.0.0/22", &["10.0.2.0/24"], 26, 16).unwrap();
    assert!(planned.windows(2).all(|w| w[0].start() > w[1].start()));
    assert_eq!(planned.len(), 12);
}

#[test]
fn planning_is_deterministic() {
    let existing = ["10.0.255.192/26", "10.0.1.0/24"];
    let first = plan_subnets("10.0.0.0/16", &existing, 26, 2).unwrap();
    let second = plan_subnets("10.0.0.0/16", &existing, 26, 2).unwrap();
    assert_eq!(first, second);
}

#[test]
fn replanning_after_a_creation_yields_the_next_block() {
    let vpc = "10.0.0.0/16";
    let first = plan_subnets::<&str>(vpc, &[], 26, 2).unwrap();
    let created = first[0].to_string();
    let again = plan_subnets(vpc, &[created.as_str()], 26, 2).unwrap();
    assert_eq!(again[0], first[1]);
}

#[test]
fn rejects_blocks_larger_than_the_parent() {
    let err = plan_subnets::<&str>("10.0.0.0/24", &[], 16, 1).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn rejects_prefix_longer_than_32() {
    let err = plan_subnets::<&str>("10.0.0.0/16", &[], 33, 1).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn rejects_malformed_cidrs() {
    assert!(plan_subnets::<&str>("10.0.0.0", &[], 26, 1).is_err());
    assert!(plan_subnets("10.0.0.0/16", &["not-a-cidr"], 26, 1).is_err());
}

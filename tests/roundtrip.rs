//! Round-trip invariants: what goes into `encap` comes back out of `deencap` unchanged, and the
//! running counters agree with how many cycles actually happened.

use rle::{Config, Receiver, Transmitter};

fn crc_config() -> Config {
    Config::builder().build().unwrap()
}

fn seqno_config() -> Config {
    Config::builder().use_alpdu_crc(false).build().unwrap()
}

fn round_trip_one(config: Config, frag_id: u8, sdu: &[u8], proto_type: u16, burst_budget: usize) {
    let mut tx = Transmitter::new(config);
    let mut rx = Receiver::new(config);
    tx.encap(frag_id, sdu, proto_type).unwrap();

    let mut result = None;
    while !tx.is_free(frag_id) {
        let ppdu = tx.pack(frag_id, burst_budget).unwrap();
        result = rx.deencap(ppdu.as_bytes()).unwrap();
    }

    let (out_frag_id, out_sdu, out_ptype) = result.expect("last PPDU should complete the ALPDU");
    assert_eq!(out_frag_id, frag_id);
    assert_eq!(&out_sdu[..], sdu);
    assert_eq!(out_ptype, proto_type);
    assert!(rx.is_free(frag_id));
}

#[test]
fn round_trips_various_sdu_sizes_and_budgets() {
    for &len in &[0usize, 1, 50, 100, 999, 1000, 4088] {
        let sdu: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
        for &budget in &[10usize, 100, 500, 4095] {
            round_trip_one(crc_config(), 0, &sdu, 0x0800, budget);
        }
    }
}

#[test]
fn round_trips_in_seqno_trailer_mode_too() {
    let sdu = [0x99u8; 2000];
    round_trip_one(seqno_config(), 5, &sdu, 0x86DD, 150);
}

#[test]
fn ptype_compression_round_trips_for_every_known_type() {
    let known = [0x0800u16, 0x0806, 0x86DD, 0x8100, 0x88A8, 0x8847, 0x8848, 0x0060];
    for ptype in known {
        let code = rle::proto_type::compress_ptype(ptype).expect("known type should compress");
        assert_eq!(rle::proto_type::decompress_ptype(code), Some(ptype));
    }
}

#[test]
fn ptype_compression_falls_back_to_escape_for_unknown_types() {
    assert_eq!(rle::proto_type::compress_ptype(0xBEEF), None);
    // Still round-trips end to end via the 3-byte escape encoding (0xFF + 2-byte ptype).
    round_trip_one(crc_config(), 6, &[1, 2, 3], 0xBEEF, 200);
}

#[test]
fn worst_case_alpdu_size_does_not_overflow() {
    // Max SDU, CRC trailer, and an uncompressible ptype (3-byte escape prefix): the largest ALPDU
    // this crate can be asked to build, 4088 + 3 + 4 = 4095 bytes.
    let sdu = [0x42u8; rle::RLE_MAX_PDU_SIZE as usize];
    round_trip_one(crc_config(), 7, &sdu, 0xBEEF, 500);
}

#[test]
fn repeated_cycles_on_one_fragment_id_accumulate_ok_counter() {
    let config = crc_config();
    let mut tx = Transmitter::new(config);
    let mut rx = Receiver::new(config);

    for i in 0..10u8 {
        tx.encap(1, &[i; 20], 0x0800).unwrap();
        let ppdu = tx.pack(1, 200).unwrap();
        rx.deencap(ppdu.as_bytes()).unwrap();
    }

    assert_eq!(tx.stats(1).sent, 10);
    assert_eq!(rx.stats(1).ok, 10);
    assert_eq!(rx.stats(1).dropped, 0);
    assert_eq!(rx.stats(1).lost, 0);
}

#[test]
fn free_on_in_use_context_frees_it_and_counts_a_drop() {
    let config = crc_config();
    let mut tx = Transmitter::new(config);
    tx.encap(4, &[1, 2, 3], 0x0800).unwrap();
    assert!(!tx.is_free(4));
    tx.free(4);
    assert!(tx.is_free(4));
    assert_eq!(tx.stats(4).dropped, 1);
}

use super::*;

#[test]
fn test_cbor_bytes() {
    let data = into_cbor_bytes("hello world".to_string()).unwrap();
    let (val, n) = from_cbor_bytes::<String>(&data).unwrap();
    assert_eq!(val, "hello world");
    assert_eq!(n, data.len());

    let data = into_cbor_bytes(0x1234_5678_u64).unwrap();
    let (val, n) = from_cbor_bytes::<u64>(&data).unwrap();
    assert_eq!(val, 0x1234_5678);
    assert_eq!(n, data.len());

    // trailing bytes are left unconsumed.
    let mut data = into_cbor_bytes(10_u64).unwrap();
    let m = data.len();
    data.extend_from_slice(&[0, 0, 0]);
    let (_, n) = from_cbor_bytes::<u64>(&data).unwrap();
    assert_eq!(n, m);

    assert!(from_cbor_bytes::<u64>(&[]).is_err());
}

#[test]
fn test_align8() {
    assert_eq!(align8(0), 0);
    assert_eq!(align8(1), 8);
    assert_eq!(align8(8), 8);
    assert_eq!(align8(9), 16);
    assert_eq!(align8(31), 32);
}

#[test]
fn test_to_offset32() {
    assert_eq!(to_offset32(10).unwrap(), 10);
    assert_eq!(to_offset32(u32::MAX as usize).unwrap(), u32::MAX);
    match to_offset32((u32::MAX as usize) + 1) {
        Err(Error::FailConvert(_, _)) => (),
        res => panic!("unexpected {:?}", res),
    }
}

use std::thread;

use jpool_constant_pool::{
    ConstantPool, ConstantPoolError, KindSet, MemberRef, ParseOptions, Parser, PoolEntry,
    Resolved, Tag, Utf8Mode, Writer,
};

fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

fn utf8(bytes: &[u8]) -> Vec<u8> {
    let mut v = vec![1, 0, bytes.len() as u8];
    v.extend_from_slice(bytes);
    v
}

/// A pool exercising every tag, with forward references, wide entries and a
/// duplicated Utf8 the way hand-written or obfuscated class files have them.
fn fixture() -> Vec<u8> {
    let entries: Vec<Vec<u8>> = vec![
        vec![10, 0, 2, 0, 3],          // #1 Methodref #2.#3
        vec![7, 0, 4],                 // #2 Class #4
        vec![12, 0, 5, 0, 6],          // #3 NameAndType #5:#6
        utf8(b"java/lang/Object"),     // #4
        utf8(b"<init>"),               // #5
        utf8(b"()V"),                  // #6
        vec![5, 0, 0, 0, 0, 0, 0, 0, 1], // #7 Long 1, #8 shadow
        vec![6, 0x40, 0x04, 0, 0, 0, 0, 0, 0], // #9 Double 2.5, #10 shadow
        vec![3, 0xff, 0xff, 0xff, 0xff], // #11 Integer -1
        vec![4, 0x3f, 0x80, 0, 0],     // #12 Float 1.0
        vec![8, 0, 14],                // #13 String #14
        utf8(&[b'h', b'i', 0xc0, 0x80]), // #14 "hi\0"
        vec![9, 0, 2, 0, 16],          // #15 Fieldref #2.#16
        vec![12, 0, 17, 0, 18],        // #16 NameAndType #17:#18
        utf8(b"f"),                    // #17
        utf8(b"I"),                    // #18
        vec![11, 0, 20, 0, 21],        // #19 InterfaceMethodref #20.#21
        vec![7, 0, 22],                // #20 Class #22
        vec![12, 0, 23, 0, 24],        // #21 NameAndType #23:#24
        utf8(b"java/lang/Runnable"),   // #22
        utf8(b"run"),                  // #23
        utf8(b"()V"),                  // #24 duplicate of #6
        vec![15, 9, 0, 19],            // #25 MethodHandle REF_invokeInterface #19
        vec![16, 0, 6],                // #26 MethodType #6
        vec![17, 0, 0, 0, 16],         // #27 Dynamic 0:#16
        vec![18, 0, 1, 0, 21],         // #28 InvokeDynamic 1:#21
        vec![19, 0, 30],               // #29 Module #30
        utf8(b"java.base"),            // #30
        vec![20, 0, 32],               // #31 Package #32
        utf8(b"java/lang"),            // #32
    ];

    let mut bytes = vec![0, 33];
    entries.iter().for_each(|e| bytes.extend_from_slice(e));
    bytes
}

fn with_fixture_pool(f: impl FnOnce(ConstantPool)) {
    init_logger();
    f(ConstantPool::parse(&fixture()).unwrap());
}

#[test]
fn test_preserve_round_trip_is_byte_identical() {
    with_fixture_pool(|mut pool| {
        assert_eq!(pool.to_bytes().unwrap(), fixture());
    });
}

#[test]
fn test_decoded_pool_keeps_input_indices() {
    with_fixture_pool(|pool| {
        assert_eq!(pool.size(), 33);
        assert_eq!(pool.utf8(6).unwrap(), "()V");
        assert_eq!(pool.utf8(24).unwrap(), "()V");
        assert_eq!(pool.long(7).unwrap(), 1);
        assert_eq!(pool.double(9).unwrap(), 2.5);
        assert_eq!(pool.integer(11).unwrap(), -1);
        assert_eq!(pool.float(12).unwrap(), 1.0);
        assert_eq!(pool.string(13).unwrap(), "hi\0");
    });
}

#[test]
fn test_decoded_pool_is_sealed() {
    with_fixture_pool(|mut pool| {
        assert!(pool.is_sealed());
        assert!(matches!(
            pool.add_utf8_str("new"),
            Err(ConstantPoolError::ImmutabilityViolation)
        ));
    });
}

#[test]
fn test_forward_references_validate() {
    with_fixture_pool(|pool| assert!(pool.validate_references().is_ok()));
}

#[test]
fn test_shadow_slots_are_unaddressable() {
    with_fixture_pool(|pool| {
        for index in [0, 8, 10, 33] {
            assert!(
                matches!(
                    pool.get(index, KindSet::all()),
                    Err(ConstantPoolError::IndexOutOfRange { .. })
                ),
                "index {}",
                index
            );
        }
    });
}

#[test]
fn test_resolve_method_ref() {
    with_fixture_pool(|pool| {
        assert_eq!(
            pool.resolve(1).unwrap(),
            Resolved::MethodRef(MemberRef {
                kind: Tag::MethodRef,
                owner: "java/lang/Object",
                name: "<init>",
                descriptor: "()V",
            })
        );
    });
}

#[test]
fn test_resolve_every_entry() {
    with_fixture_pool(|pool| {
        let rendered: Vec<String> = pool
            .iter()
            .map(|(index, _)| pool.resolve(index).unwrap().to_string())
            .collect();

        assert!(rendered.contains(&"java/lang/Runnable.run:()V".to_owned()));
        assert!(rendered.contains(&"REF_invokeInterface java/lang/Runnable.run:()V".to_owned()));
        assert!(rendered.contains(&"#0:f:I".to_owned()));
        assert!(rendered.contains(&"#1:run:()V".to_owned()));
        assert!(rendered.contains(&"java.base".to_owned()));
        assert_eq!(rendered.len(), 30);
    });
}

#[test]
fn test_canonical_write_merges_duplicates_and_keeps_meaning() {
    with_fixture_pool(|pool| {
        let mut writer = Writer::new();
        let remap = writer.write_canonical(&pool).unwrap();
        let canonical = ConstantPool::parse(writer.as_bytes()).unwrap();

        assert_eq!(canonical.size(), pool.size() - 1);
        assert_eq!(remap.get(6), remap.get(24));
        for (index, _) in pool.iter() {
            let mapped = remap.get(index).unwrap();
            assert_eq!(
                pool.resolve(index).unwrap(),
                canonical.resolve(mapped).unwrap()
            );
        }

        // Everything a user refers to comes first.
        for (index, entry) in canonical.iter() {
            for reference in entry.references() {
                assert!(reference.index < index, "#{} -> #{}", index, reference.index);
            }
        }
    });
}

#[test]
fn test_canonical_form_is_stable() {
    with_fixture_pool(|pool| {
        let mut once = Writer::new();
        once.write_canonical(&pool).unwrap();
        let canonical = ConstantPool::parse(once.as_bytes()).unwrap();

        let mut twice = Writer::new();
        twice.write_canonical(&canonical).unwrap();

        assert_eq!(once.as_bytes(), twice.as_bytes());
    });
}

#[test]
fn test_hello_class_scenario() {
    init_logger();
    let bytes = [0, 3, 1, 0, 5, b'H', b'e', b'l', b'l', b'o', 7, 0, 1];

    let pool = ConstantPool::parse(&bytes).unwrap();

    assert_eq!(pool.resolve(2).unwrap(), Resolved::Class("Hello"));
    assert_eq!(pool.class_name(2).unwrap(), "Hello");
}

#[test]
fn test_unsupported_tag_aborts_the_parse() {
    init_logger();
    let bytes = [0, 4, 1, 0, 1, b'a', 99, 7, 0, 1, 3, 0, 0, 0, 0];
    let mut parser = Parser::new(&bytes);

    assert!(matches!(
        parser.parse_constant_pool(),
        Err(ConstantPoolError::UnsupportedTag { tag: 99, offset: 6 })
    ));
    assert_eq!(parser.position(), 7);
}

#[test]
fn test_truncated_pool_aborts_the_parse() {
    let mut bytes = fixture();
    bytes.truncate(bytes.len() - 3);

    assert!(matches!(
        ConstantPool::parse(&bytes),
        Err(ConstantPoolError::TruncatedInput { .. })
    ));
}

#[test]
fn test_lenient_utf8_is_opt_in() {
    init_logger();
    let bytes = [0, 2, 1, 0, 3, b'o', 0xed, b'k'];

    assert!(matches!(
        ConstantPool::parse(&bytes),
        Err(ConstantPoolError::MalformedUtf8 { offset: 6 })
    ));

    let mut pool = Parser::with_options(
        &bytes,
        ParseOptions {
            utf8: Utf8Mode::Lenient,
        },
    )
    .parse_constant_pool()
    .unwrap();
    assert_eq!(pool.utf8(1).unwrap(), "o\u{FFFD}k");
    // The original bytes are what gets written back.
    assert_eq!(pool.to_bytes().unwrap(), bytes);
}

#[test]
fn test_adding_a_class_twice_returns_the_same_index() {
    let mut pool = ConstantPool::new();

    let first = pool.add_class_named("Foo").unwrap();
    let second = pool.add_class_named("Foo").unwrap();

    assert_eq!(first, second);
    assert_eq!(pool.size(), 3);
}

#[test]
fn test_serialized_size_ignores_duplicate_add_order() {
    let mut a = ConstantPool::new();
    a.add_class_named("Foo").unwrap();
    a.add_class_named("Foo").unwrap();
    a.add_class_named("Bar").unwrap();

    let mut b = ConstantPool::new();
    b.add_class_named("Bar").unwrap();
    b.add_class_named("Foo").unwrap();
    b.add_class_named("Bar").unwrap();
    b.add_class_named("Foo").unwrap();

    assert_eq!(a.to_bytes().unwrap().len(), b.to_bytes().unwrap().len());
}

#[test]
fn test_built_pool_round_trips() {
    let mut pool = ConstantPool::new();
    let method = pool
        .add_method_ref_named("java/io/PrintStream", "println", "(Ljava/lang/String;)V")
        .unwrap();
    let field = pool
        .add_field_ref_named("java/lang/System", "out", "Ljava/io/PrintStream;")
        .unwrap();
    let greeting = pool.add_string_value("Hello, \u{1F600}").unwrap();
    pool.add_long(i64::MIN).unwrap();

    let bytes = pool.to_bytes().unwrap();
    let decoded = ConstantPool::parse(&bytes).unwrap();

    assert_eq!(decoded.size(), pool.size());
    assert_eq!(decoded.resolve(method).unwrap(), pool.resolve(method).unwrap());
    assert_eq!(decoded.resolve(field).unwrap(), pool.resolve(field).unwrap());
    assert_eq!(decoded.string(greeting).unwrap(), "Hello, \u{1F600}");
}

#[test]
fn test_sealed_pool_is_shared_between_readers() {
    with_fixture_pool(|pool| {
        thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| pool.resolve(1).map(|r| r.to_string())))
                .collect();

            for handle in handles {
                assert_eq!(
                    handle.join().unwrap().unwrap(),
                    "java/lang/Object.<init>:()V"
                );
            }
        });
    });
}

#[test]
fn test_entries_report_their_tags() {
    with_fixture_pool(|pool| {
        let tags: Vec<Tag> = pool.iter().map(|(_, entry)| entry.tag()).collect();

        assert_eq!(tags.len(), 30);
        assert_eq!(tags[0], Tag::MethodRef);
        assert!(matches!(pool.entry(25).unwrap(), PoolEntry::MethodHandle(_)));
    });
}

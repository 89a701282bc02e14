use std::{env, fs::File};

use jpool_constant_pool::{Parser, Writer};
use memmap::Mmap;

fn main() {
    pretty_env_logger::init();

    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: cpdump <file.class> [--canonical]");
        return;
    };
    let canonical = args.any(|a| a == "--canonical");

    let file = File::open(&path).unwrap();
    let mmap = unsafe { Mmap::map(&file).unwrap() };

    let prefix = Parser::new(&mmap).parse_class_prefix().unwrap();
    let pool = &prefix.constant_pool;

    println!("{}", path);
    println!("  version: {}.{}", prefix.version.0, prefix.version.1);
    println!("  constant pool count: {}", pool.size());
    println!();

    for (index, entry) in pool {
        let resolved = match pool.resolve(index) {
            Ok(resolved) => resolved.to_string(),
            Err(e) => {
                log::warn!("#{} does not resolve: {}", index, e);
                String::from("?")
            }
        };

        println!("  {:>6} = {:<40} // {}", format!("#{}", index), entry.to_string(), resolved);
    }

    if canonical {
        let mut writer = Writer::new();
        let remap = writer.write_canonical(pool).unwrap();
        let merged = pool.iter().filter(|(i, _)| remap.get(*i) != Some(*i)).count();

        println!();
        println!(
            "  canonical: {} bytes, {} entries moved or merged",
            writer.as_bytes().len(),
            merged
        );
    }
}

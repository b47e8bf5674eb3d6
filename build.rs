use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    // 再現ビルドでは SOURCE_DATE_EPOCH を優先
    let timestamp = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .ok()
                .map(|d| d.as_secs())
        });

    match timestamp {
        Some(ts) => println!("cargo:rustc-env=CAFE_MENU_BUILD_TIME={}", ts),
        None => println!("cargo:warning=Could not determine build time"),
    }

    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=src");
}

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=WALLET_CORE_LIB_DIR");

    // The embedded backend needs nothing from the native side
    if env::var_os("CARGO_FEATURE_TRUST_WALLET_CORE").is_none() {
        return;
    }

    if let Some(dir) = env::var_os("WALLET_CORE_LIB_DIR") {
        let dir = PathBuf::from(dir);
        println!("cargo:rustc-link-search=native={}", dir.display());
        // trezor-crypto is built into its own subdirectory
        println!("cargo:rustc-link-search=native={}", dir.join("trezor-crypto").display());
    } else {
        println!("cargo:warning=WALLET_CORE_LIB_DIR is not set; relying on the system library path");
    }

    println!("cargo:rustc-link-lib=TrustWalletCore");
    println!("cargo:rustc-link-lib=TrezorCrypto");
    println!("cargo:rustc-link-lib=protobuf");

    match env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("macos") | Ok("ios") => println!("cargo:rustc-link-lib=c++"),
        _ => {
            println!("cargo:rustc-link-lib=stdc++");
            println!("cargo:rustc-link-lib=m");
        }
    }
}

#![no_main]
use libfuzzer_sys::fuzz_target;

use ling_regex::{compile, Flags};

fuzz_target!(|data: &[u8]| {
    let Ok(pattern) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(regex) = compile(pattern, Flags::all(), None) {
        let _ = regex.matcher(pattern).count();
    }
});

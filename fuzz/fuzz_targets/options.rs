#![no_main]

use libfuzzer_sys::fuzz_target;
use specrun::options::OptionSet;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // Any argv is parsed or rejected without panicking, and so is its remote form
        let args: Vec<&str> = text.split('\0').collect();
        if let Ok(options) = OptionSet::parse(args) {
            let _ = OptionSet::parse(options.to_remote_argv());
        }
    }
});

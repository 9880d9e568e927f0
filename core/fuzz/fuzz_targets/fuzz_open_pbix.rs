#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::{Cursor, Read};

use pbix_inspect::{ContainerLimits, PbixContainer};

fuzz_target!(|data: &[u8]| {
    let limits = ContainerLimits {
        max_entries: 2000,
        max_entry_uncompressed_bytes: 5 * 1024 * 1024,
    };

    let Ok(mut container) =
        PbixContainer::open_from_reader_with_limits(Cursor::new(data.to_vec()), limits)
    else {
        return;
    };
    let _ = container.entries();
    if let Ok(Some(mut entry)) = container.locate("DataModel") {
        let mut sink = Vec::new();
        let _ = entry.read_to_end(&mut sink);
    }
});

// SPDX-License-Identifier: PMPL-1.0-or-later

use caret_command::{dispatch, runtime};

fn main() {
    runtime::init();
    let status = dispatch::run(std::env::args().collect());
    std::process::exit(status);
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
pub mod bash;
pub mod edit_file;
pub mod grep;
pub mod multi_edit;
pub mod read_file;
pub mod tree;
pub mod write;

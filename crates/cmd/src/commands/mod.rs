// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub mod delete;
pub mod save;
pub mod search;
pub mod show;

pub use delete::delete_command;
pub use save::{SaveMode, save_command};
pub use search::{names_command, search_command};
pub use show::{resources_command, show_command};

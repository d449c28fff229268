// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod assistant;
pub mod auth;
pub mod backend;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod household;
pub mod invite;
pub mod mappers;
pub mod models;
pub mod mutations;
pub mod payments;
pub mod rows;
pub mod saga;
pub mod store;
pub mod utils;
pub mod wizard;

// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod clients;
pub mod products;
pub mod orders;
pub mod transactions;
pub mod reports;
pub mod exporter;
pub mod config;
pub mod doctor;

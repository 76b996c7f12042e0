// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod order;
mod pagination;

pub use order::OrderExtension;
pub use pagination::{ITEMS_PER_PAGE_FILTER, PAGE_FILTER, PaginationExtension};

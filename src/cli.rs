// Copyright 2026 Phonedex Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;

use crate::api::Features;
use crate::api::PredictTarget;
use crate::api::PriceQuery;
use crate::filter::Filter;
use crate::filter::RangeField;
use crate::filter::SortField;
use crate::filter::SortOrder;
use crate::filter_expr;

#[derive(Parser, Debug)]
#[command(
    name = "phonedex",
    version,
    about = "Browse, filter, compare and export phone specifications"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default phonedex.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Config {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the canonical query parameters for a filter
    Params(ParamsArgs),

    /// Fetch one page of phones
    Search(SearchArgs),

    /// Page through results interactively
    Browse(BrowseArgs),

    /// Write one page of phones to CSV
    Export(ExportArgs),

    /// Find phones similar to the given features
    Similar(SimilarArgs),

    /// Find phones around a price point
    ByPrice(ByPriceArgs),

    /// Predict an attribute from the given features
    Predict(PredictArgs),

    /// Manage the comparison set
    #[command(subcommand)]
    Compare(CompareCommand),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum CompareCommand {
    /// Add a phone to the comparison set
    Add {
        brand: String,
        name: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove the entry at a 1-based position
    Rm {
        index: usize,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// List the comparison set
    List {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Empty the comparison set
    Clear {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch current specs for every compared phone
    Show {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

/// Filter flags shared by every dataset command.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Free-text search
    #[arg(short, long)]
    pub query: Option<String>,

    /// Brand to include (repeatable)
    #[arg(long)]
    pub brand: Vec<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub min_ram: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub max_ram: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub min_battery: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub max_battery: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub min_price: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub max_price: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub min_screen_size: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub max_screen_size: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub min_storage: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub max_storage: Option<f64>,

    /// Release year to include (repeatable)
    #[arg(long)]
    pub year: Vec<u32>,

    /// Processor substring
    #[arg(long)]
    pub processor: Option<String>,

    #[arg(long, value_enum, default_value_t = SortField::Name)]
    pub sort_by: SortField,

    #[arg(long, value_enum, default_value_t = SortOrder::Asc)]
    pub sort_order: SortOrder,

    /// Filter expression, e.g. "brand IN ('Apple') AND ram >= 8"
    #[arg(long = "where")]
    pub where_expr: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> Result<Filter> {
        let mut filter = Filter::default();
        if let Some(query) = &self.query {
            filter.set_query(query);
        }
        for brand in &self.brand {
            filter.add_brand(brand);
        }
        let ranges = [
            (RangeField::Ram, self.min_ram, self.max_ram),
            (RangeField::Battery, self.min_battery, self.max_battery),
            (RangeField::Price, self.min_price, self.max_price),
            (RangeField::ScreenSize, self.min_screen_size, self.max_screen_size),
            (RangeField::Storage, self.min_storage, self.max_storage),
        ];
        for (field, min, max) in ranges {
            filter.set_range(field, min, max);
        }
        for year in &self.year {
            filter.add_year(*year);
        }
        if let Some(processor) = &self.processor {
            filter.set_processor(processor);
        }
        filter.set_sort(self.sort_by, self.sort_order);
        if let Some(expr) = &self.where_expr {
            filter_expr::apply_str(expr, &mut filter)?;
        }
        Ok(filter)
    }
}

#[derive(Args, Debug)]
pub struct ParamsArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Page size (defaults to page_limit from config)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BrowseArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Page size (defaults to page_limit from config)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Page size (defaults to page_limit from config)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output file (defaults to phones-YYYY-MM-DD.csv)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

/// Phone attributes sent to the similarity and prediction endpoints.
#[derive(Args, Debug, Default, Clone)]
pub struct FeatureArgs {
    #[arg(long)]
    pub brand: Option<String>,

    #[arg(long)]
    pub ram: Option<f64>,

    #[arg(long)]
    pub battery: Option<f64>,

    #[arg(long)]
    pub screen_size: Option<f64>,

    #[arg(long)]
    pub weight: Option<f64>,

    #[arg(long)]
    pub year: Option<u32>,

    #[arg(long)]
    pub price: Option<f64>,

    #[arg(long)]
    pub storage: Option<f64>,

    #[arg(long)]
    pub front_camera: Option<f64>,

    #[arg(long)]
    pub back_camera: Option<f64>,

    #[arg(long)]
    pub processor: Option<String>,
}

impl FeatureArgs {
    pub fn to_features(&self) -> Features {
        Features {
            brand: self.brand.clone(),
            ram: self.ram,
            battery: self.battery,
            screen_size: self.screen_size,
            weight: self.weight,
            year: self.year,
            price: self.price,
            storage: self.storage,
            front_camera: self.front_camera,
            back_camera: self.back_camera,
            processor: self.processor.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct SimilarArgs {
    #[command(flatten)]
    pub features: FeatureArgs,

    /// Use a dataset phone's specs instead of explicit features
    #[arg(long, num_args = 2, value_names = ["BRAND", "NAME"])]
    pub like: Option<Vec<String>>,

    /// Number of similar phones to return
    #[arg(long, default_value_t = 5)]
    pub limit: usize,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ByPriceArgs {
    /// Target price
    pub price: f64,

    /// Relative tolerance in [0, 1]
    #[arg(long, default_value_t = PriceQuery::DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Page size (defaults to page_limit from config)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[arg(value_enum)]
    pub target: PredictTarget,

    #[command(flatten)]
    pub features: FeatureArgs,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

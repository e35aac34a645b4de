mod computer;
mod memory;
mod watchlist;

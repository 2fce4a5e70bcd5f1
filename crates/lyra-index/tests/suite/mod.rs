mod refresh;
mod search;

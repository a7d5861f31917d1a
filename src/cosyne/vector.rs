use std::ops::{Add, Index, IndexMut, Mul};

use itertools::Itertools;

/// Dense real vector used for layer inputs, outputs and materialized weights.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RealVector(Vec<f64>);

impl RealVector {
    pub fn zeros(len: usize) -> RealVector {
        RealVector(vec![0.; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, f64> {
        self.0.iter_mut()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    pub fn reduce(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn dot(&self, other: &RealVector) -> f64 {
        debug_assert!(self.len() == other.len(), "Tried to take a dot product of vectors with different lengths");
        self.0.iter().zip_eq(other.0.iter()).fold(0., |acc, (a, b)| acc + a * b)
    }

    pub fn scale(&mut self, factor: f64) {
        for x in self.0.iter_mut() {
            *x *= factor;
        }
    }

    pub fn max(&self) -> f64 {
        self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

impl From<Vec<f64>> for RealVector {
    fn from(values: Vec<f64>) -> RealVector {
        RealVector(values)
    }
}

impl FromIterator<f64> for RealVector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> RealVector {
        RealVector(iter.into_iter().collect())
    }
}

impl Index<usize> for RealVector {
    type Output = f64;
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for RealVector {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl Add for &RealVector {
    type Output = RealVector;
    fn add(self, rhs: &RealVector) -> RealVector {
        self.0.iter().zip_eq(rhs.0.iter()).map(|(a, b)| a + b).collect()
    }
}

impl Mul for &RealVector {
    type Output = RealVector;
    fn mul(self, rhs: &RealVector) -> RealVector {
        self.0.iter().zip_eq(rhs.0.iter()).map(|(a, b)| a * b).collect()
    }
}
